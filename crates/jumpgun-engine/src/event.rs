//! The game's event vocabulary.
//!
//! One tagged union replaces per-name payload dictionaries. Subscribers key
//! on [`EventKind`] and read the payload through the typed accessors, which
//! report a mismatch as [`EcsError::MalformedEvent`] instead of panicking.

use jumpgun_ecs::entity::EntityId;
use jumpgun_ecs::event::{BusEvent, EventBus};
use jumpgun_ecs::EcsError;

use crate::collision::Contact;
use crate::components::button::ButtonKind;
use crate::services::Key;

/// The bus type shared by the scene, components and modes.
pub type GameBus = EventBus<GameEvent>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Collision,
    KeyPress,
    NextLevel,
    EnemyDeath,
    EnemyHit,
    EnemyAttack,
    PlayerDeath,
    ButtonClicked,
    LevelReady,
    LevelGenerationFailed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    /// Two live collider boxes overlap. Published once per ordered pair.
    Collision(Contact),
    /// A key changed state this frame.
    KeyPress { key: Key, down: bool },
    /// The player walked through the exit portal.
    NextLevel,
    EnemyDeath { enemy: EntityId, count: u32 },
    /// A player projectile struck an enemy.
    EnemyHit { enemy: EntityId, damage: i32 },
    /// An enemy struck the player.
    EnemyAttack {
        enemy: EntityId,
        damage: i32,
        ranged: bool,
    },
    PlayerDeath { level: u32 },
    ButtonClicked { button: ButtonKind },
    LevelReady { level: u32 },
    LevelGenerationFailed { level: u32, reason: String },
}

impl BusEvent for GameEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            GameEvent::Collision(_) => EventKind::Collision,
            GameEvent::KeyPress { .. } => EventKind::KeyPress,
            GameEvent::NextLevel => EventKind::NextLevel,
            GameEvent::EnemyDeath { .. } => EventKind::EnemyDeath,
            GameEvent::EnemyHit { .. } => EventKind::EnemyHit,
            GameEvent::EnemyAttack { .. } => EventKind::EnemyAttack,
            GameEvent::PlayerDeath { .. } => EventKind::PlayerDeath,
            GameEvent::ButtonClicked { .. } => EventKind::ButtonClicked,
            GameEvent::LevelReady { .. } => EventKind::LevelReady,
            GameEvent::LevelGenerationFailed { .. } => EventKind::LevelGenerationFailed,
        }
    }
}

impl GameEvent {
    fn malformed(&self, expected: EventKind) -> EcsError {
        EcsError::MalformedEvent {
            expected: format!("{expected:?}"),
            found: format!("{:?}", self.kind()),
        }
    }

    pub fn as_contact(&self) -> Result<&Contact, EcsError> {
        match self {
            GameEvent::Collision(contact) => Ok(contact),
            other => Err(other.malformed(EventKind::Collision)),
        }
    }

    pub fn as_key_press(&self) -> Result<(Key, bool), EcsError> {
        match self {
            GameEvent::KeyPress { key, down } => Ok((*key, *down)),
            other => Err(other.malformed(EventKind::KeyPress)),
        }
    }

    pub fn as_enemy_death(&self) -> Result<(EntityId, u32), EcsError> {
        match self {
            GameEvent::EnemyDeath { enemy, count } => Ok((*enemy, *count)),
            other => Err(other.malformed(EventKind::EnemyDeath)),
        }
    }

    pub fn as_enemy_hit(&self) -> Result<(EntityId, i32), EcsError> {
        match self {
            GameEvent::EnemyHit { enemy, damage } => Ok((*enemy, *damage)),
            other => Err(other.malformed(EventKind::EnemyHit)),
        }
    }

    pub fn as_enemy_attack(&self) -> Result<(EntityId, i32, bool), EcsError> {
        match self {
            GameEvent::EnemyAttack {
                enemy,
                damage,
                ranged,
            } => Ok((*enemy, *damage, *ranged)),
            other => Err(other.malformed(EventKind::EnemyAttack)),
        }
    }

    pub fn as_player_death(&self) -> Result<u32, EcsError> {
        match self {
            GameEvent::PlayerDeath { level } => Ok(*level),
            other => Err(other.malformed(EventKind::PlayerDeath)),
        }
    }

    pub fn as_button(&self) -> Result<ButtonKind, EcsError> {
        match self {
            GameEvent::ButtonClicked { button } => Ok(*button),
            other => Err(other.malformed(EventKind::ButtonClicked)),
        }
    }

    pub fn as_level_ready(&self) -> Result<u32, EcsError> {
        match self {
            GameEvent::LevelReady { level } => Ok(*level),
            other => Err(other.malformed(EventKind::LevelReady)),
        }
    }
}

/// Log and drop a payload mismatch inside a bus handler.
///
/// Handlers cannot return errors to the publisher, so this is where a
/// malformed event surfaces.
pub(crate) fn accept<T>(result: Result<T, EcsError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(error = %e, "dropping malformed event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessor_returns_payload_for_matching_kind() {
        let e = GameEvent::EnemyHit {
            enemy: EntityId::new(1, 0),
            damage: 20,
        };
        assert_eq!(e.as_enemy_hit().unwrap(), (EntityId::new(1, 0), 20));
    }

    #[test]
    fn accessor_mismatch_names_both_kinds() {
        let e = GameEvent::NextLevel;
        match e.as_key_press() {
            Err(EcsError::MalformedEvent { expected, found }) => {
                assert_eq!(expected, "KeyPress");
                assert_eq!(found, "NextLevel");
            }
            other => panic!("expected MalformedEvent, got {other:?}"),
        }
    }

    #[test]
    fn kinds_route_on_the_bus() {
        let mut bus = GameBus::new();
        let inbox = jumpgun_ecs::event::Inbox::new();
        bus.forward(EventKind::LevelReady, &inbox, |e| accept(e.as_level_ready()));
        bus.publish(&GameEvent::LevelReady { level: 3 });
        bus.publish(&GameEvent::NextLevel);
        assert_eq!(inbox.drain(), vec![3]);
    }
}
