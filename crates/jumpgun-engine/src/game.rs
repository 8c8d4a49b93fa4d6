//! The frame driver.
//!
//! [`Game::frame`] runs one frame in a fixed order:
//!
//! 1. Key state changes are re-published on the bus as `KeyPress` events.
//! 2. The mode machine runs (menus, pause, death handling).
//! 3. During gameplay, the level manager handles level events and picks up
//!    finished layouts.
//! 4. Entities update. While paused only UI entities do.
//! 5. Colliders are checked and contacts published (not while paused).
//! 6. The cleanup boundary admits and removes entities.
//! 7. Everything live is drawn.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::collision;
use crate::config::GameConfig;
use crate::event::GameEvent;
use crate::level::LevelError;
use crate::modes::{mode_machine, GameCore, GameMode, ModeMachine};
use crate::scene::{CleanupReport, UpdateScope};
use crate::services::{Key, RenderSurface, Services};
use crate::GameError;

/// What happened during one frame.
#[derive(Debug, Default)]
pub struct FrameReport {
    /// Mode entered this frame, if it changed.
    pub mode_changed: Option<GameMode>,
    pub contacts: usize,
    pub cleanup: CleanupReport,
    /// Level whose layout was spawned this frame.
    pub level_ready: Option<u32>,
    /// Generation failed; the previous level stays in play.
    pub level_error: Option<LevelError>,
}

pub struct Game {
    core: GameCore,
    modes: ModeMachine,
    held: BTreeSet<Key>,
    frames: u64,
}

impl Game {
    pub fn new(config: GameConfig, services: Services) -> Result<Self, GameError> {
        config.validate()?;
        let mut core = GameCore::new(config, services);
        let mut modes = mode_machine();
        modes.start(GameMode::MainMenu, &mut core)?;
        info!("game started in main menu");
        Ok(Self {
            core,
            modes,
            held: BTreeSet::new(),
            frames: 0,
        })
    }

    pub fn frame(&mut self, dt: f32, surface: &mut dyn RenderSurface) -> Result<FrameReport, GameError> {
        let mut report = FrameReport::default();
        self.frames += 1;

        self.publish_key_edges();

        report.mode_changed = self.modes.execute(&mut self.core, dt)?;
        if let Some(mode) = report.mode_changed {
            info!(mode = ?mode, frame = self.frames, "mode changed");
        }
        let mode = self.mode();

        let core = &mut self.core;
        if mode == GameMode::Gameplay && core.session_active() {
            match core.level.tick(&mut core.scene) {
                Ok(ready) => report.level_ready = ready,
                Err(e) => report.level_error = Some(e),
            }
        }

        let paused = mode == GameMode::Paused;
        let scope = if paused { UpdateScope::UiOnly } else { UpdateScope::All };
        core.scene.update(dt, scope, &mut core.services);
        if !paused {
            report.contacts = collision::run(&mut core.scene);
        }
        report.cleanup = core.scene.cleanup(&mut core.services);
        core.scene.draw(surface);
        Ok(report)
    }

    fn publish_key_edges(&mut self) {
        for key in Key::ALL {
            let down = self.core.services.input.is_key_down(key);
            let was_down = self.held.contains(&key);
            if down == was_down {
                continue;
            }
            if down {
                self.held.insert(key);
            } else {
                self.held.remove(&key);
            }
            debug!(key = ?key, down, "key edge");
            self.core.scene.publish(&GameEvent::KeyPress { key, down });
        }
    }

    pub fn mode(&self) -> GameMode {
        self.modes.current().unwrap_or(GameMode::MainMenu)
    }

    pub fn quit_requested(&self) -> bool {
        self.core.quit_requested()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn core(&self) -> &GameCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut GameCore {
        &mut self.core
    }
}

impl std::fmt::Debug for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Game")
            .field("mode", &self.modes.current())
            .field("frames", &self.frames)
            .field("core", &self.core)
            .finish()
    }
}
