//! JumpGun ECS -- entity handles, typed components, deferred lifecycle and a
//! synchronous event bus.
//!
//! This crate holds the engine-agnostic leaves of the game core. It knows
//! nothing about sprites, levels or players; the `jumpgun-engine` crate builds
//! its scene graph on top of these pieces.
//!
//! # Quick Start
//!
//! ```
//! use jumpgun_ecs::prelude::*;
//!
//! struct Health(u32);
//!
//! let mut alloc = EntityAllocator::new();
//! let id = alloc.allocate();
//!
//! let mut parts: ComponentSet<dyn ComponentObject> = ComponentSet::new();
//! parts.insert(Box::new(Health(100))).unwrap();
//!
//! assert_eq!(parts.get::<Health>().map(|h| h.0), Some(100));
//! assert!(parts.require::<String>(id).is_err());
//! ```

#![deny(unsafe_code)]

pub mod command;
pub mod component;
pub mod entity;
pub mod event;
pub mod geometry;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {entity:?} does not exist (stale or never allocated)")]
    StaleEntity { entity: entity::EntityId },

    /// A hard dependency of some component is absent on the entity.
    #[error("entity {entity:?} is missing required component '{component}'")]
    MissingComponent {
        entity: entity::EntityId,
        component: String,
    },

    /// A second component of an already present kind was attached.
    #[error("component '{component}' is already attached to this entity")]
    DuplicateComponent { component: String },

    /// An event did not carry the payload the subscriber expected.
    #[error("malformed event payload: expected {expected}, found {found}")]
    MalformedEvent { expected: String, found: String },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::command::{Batch, CommandBuffer, QueueReport};
    pub use crate::component::{ComponentKind, ComponentObject, ComponentSet};
    pub use crate::entity::{EntityAllocator, EntityId};
    pub use crate::event::{BusEvent, EventBus, Inbox, SubscriptionId};
    pub use crate::geometry::{Rect, Vec2};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
