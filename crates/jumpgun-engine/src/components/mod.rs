//! Concrete components: rendering, collision membership, and the actors of
//! a level.

pub mod button;
pub mod collider;
pub mod enemy;
pub mod player;
pub mod portal;
pub mod projectile;
pub mod sprite;

pub use button::{Button, ButtonKind};
pub use collider::Collider;
pub use enemy::{Enemy, EnemyKind, EnemyStats};
pub use player::{Character, Player};
pub use portal::{Portal, PortalKind};
pub use projectile::{Faction, Projectile};
pub use sprite::SpriteRenderer;
