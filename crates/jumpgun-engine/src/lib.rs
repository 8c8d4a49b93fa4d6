//! JumpGun Engine -- the simulation core of a 2D side-scrolling shooter.
//!
//! This crate builds on [`jumpgun_ecs`] to provide the game: a [`Scene`](scene::Scene)
//! with deferred entity admission and removal, box collision with a landing
//! tie-break, a generic state machine driving both enemy AI and the menu
//! flow, a procedural level generator that runs on a worker thread, and the
//! [`Game`](game::Game) frame driver tying them together.
//!
//! Rendering, audio, input and asset loading are reached through the traits
//! in [`services`]; headless implementations are included for tests and demos.
//!
//! # Quick Start
//!
//! ```
//! use jumpgun_engine::prelude::*;
//!
//! let input = ScriptedInput::new();
//! let services = Services::headless(input.clone(), RecordingAudio::new());
//! let mut game = Game::new(GameConfig::default(), services).unwrap();
//! let mut surface = RecordingSurface::new();
//!
//! game.frame(1.0 / 60.0, &mut surface).unwrap();
//! assert_eq!(game.mode(), GameMode::MainMenu);
//! assert_eq!(game.core().scene.count_tag("button"), 4);
//! ```

#![deny(unsafe_code)]

pub mod ai;
pub mod collision;
pub mod components;
pub mod config;
pub mod event;
pub mod fsm;
pub mod game;
pub mod level;
pub mod logging;
pub mod modes;
pub mod scene;
pub mod services;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

/// Re-export the ECS crate for convenience.
pub use jumpgun_ecs;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors surfaced by the frame driver.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error(transparent)]
    Ecs(#[from] jumpgun_ecs::EcsError),

    #[error(transparent)]
    Level(#[from] level::LevelError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("mode machine: {0}")]
    Fsm(#[from] fsm::FsmError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use jumpgun_ecs::prelude::*;

    pub use crate::ai::{decide_state, EnemyAction, EnemyBody, EnemyState};
    pub use crate::collision::{check_collision, Contact, GroundOutcome, GroundTracker};
    pub use crate::components::{
        Button, ButtonKind, Character, Collider, Enemy, EnemyKind, Faction, Player, Portal,
        PortalKind, Projectile, SpriteRenderer,
    };
    pub use crate::config::{ConfigError, GameConfig};
    pub use crate::event::{EventKind, GameBus, GameEvent};
    pub use crate::fsm::{FsmError, State, StateMachine, Transition};
    pub use crate::game::{FrameReport, Game};
    pub use crate::level::{GenerationRequest, LevelError, LevelLayout, LevelManager, Theme, TileGrid};
    pub use crate::modes::{GameCore, GameMode};
    pub use crate::scene::{
        CleanupReport, Component, Entity, EntityBuilder, FrameContext, Layer, Scene, UpdateScope,
    };
    pub use crate::services::{
        Color, Key, MouseButtonState, RecordingAudio, RecordingSurface, ScriptedInput, Services,
    };
    pub use crate::GameError;
}
