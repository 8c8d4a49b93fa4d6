//! Procedural levels.
//!
//! - [`grid`] -- the tile grid platforms snap to.
//! - [`generator`] -- seeded placement and the adjacency merge, pure and `Send`.
//! - [`worker`] -- runs the generator off the frame loop and hands the
//!   finished layout back over a channel.
//! - [`manager`] -- level counters, theme table, and turning layouts into
//!   entities.

pub mod generator;
pub mod grid;
pub mod manager;
pub mod worker;

pub use generator::{generate, generate_with_retry, merge_adjacent, GenerationRequest, LevelLayout, Theme};
pub use grid::TileGrid;
pub use manager::{Environment, LevelManager};
pub use worker::PendingLevel;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    #[error("placed {placed} of {requested} platforms (grid holds {capacity})")]
    NoValidPlacement {
        requested: usize,
        placed: usize,
        capacity: usize,
    },

    #[error("invalid generation request: {reason}")]
    InvalidRequest { reason: String },

    #[error("failed to start level worker: {0}")]
    WorkerSpawn(String),

    #[error("level worker exited without a result")]
    WorkerDisconnected,
}
