//! Enemy behaviour states.
//!
//! Every enemy runs a two-state machine. Which state is active is decided
//! each frame from the distance to the player ([`decide_state`]); the states
//! themselves only produce motion and attack intents on the [`EnemyBody`],
//! which the owning component then applies to the scene.
//!
//! There is no hysteresis: an enemy standing right at its detection radius
//! may flip between states every frame.

use jumpgun_ecs::geometry::{Rect, Vec2};

use crate::fsm::{State, StateMachine, Transition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyState {
    Move,
    Attack,
}

/// Attack when the player is within `radius` (inclusive), otherwise move.
pub fn decide_state(enemy: Vec2, player: Vec2, radius: f32) -> EnemyState {
    if enemy.distance(player) <= radius {
        EnemyState::Attack
    } else {
        EnemyState::Move
    }
}

/// What an enemy wants done this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnemyAction {
    /// Melee hit on the player.
    Strike,
    /// Launch a projectile in this horizontal direction.
    Fire { direction: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSighting {
    pub position: Vec2,
    pub bounds: Rect,
}

/// The state machine's owner: kinematics, perception and pending intents.
#[derive(Debug, Clone)]
pub struct EnemyBody {
    pub position: Vec2,
    pub bounds: Rect,
    pub speed: f32,
    pub chase_speed: Option<f32>,
    /// +1 walking right, -1 walking left.
    pub direction: f32,
    pub grounded: bool,
    /// Horizontal range the enemy may patrol, once known.
    pub area: Option<Rect>,
    pub player: Option<PlayerSighting>,
    pub ranged: bool,
    pub attack_cooldown: f32,
    pub attack_timer: f32,
    pub actions: Vec<EnemyAction>,
}

impl EnemyBody {
    pub fn new(position: Vec2, speed: f32, ranged: bool, attack_cooldown: f32) -> Self {
        Self {
            position,
            bounds: Rect::new(position.x, position.y, 0.0, 0.0),
            speed,
            chase_speed: None,
            direction: 1.0,
            grounded: false,
            area: None,
            player: None,
            ranged,
            attack_cooldown,
            attack_timer: 0.0,
            actions: Vec::new(),
        }
    }

    fn half_width(&self) -> f32 {
        self.bounds.width / 2.0
    }

    /// The player stands inside the patrol area, above its centre line.
    fn player_on_area(&self) -> bool {
        match (self.area, self.player) {
            (Some(area), Some(p)) => {
                p.position.x >= area.left()
                    && p.position.x <= area.right()
                    && p.position.y <= area.center().y
                    && p.position.y >= area.top()
            }
            _ => false,
        }
    }

    fn face_player(&mut self) {
        if let Some(p) = self.player {
            self.direction = if p.position.x < self.position.x { -1.0 } else { 1.0 };
        }
    }
}

pub type EnemyMachine = StateMachine<EnemyState, EnemyBody>;

pub fn enemy_machine() -> EnemyMachine {
    StateMachine::new()
        .with_state(EnemyState::Move, MoveState)
        .with_state(EnemyState::Attack, AttackState)
}

// ---------------------------------------------------------------------------
// Move
// ---------------------------------------------------------------------------

/// Patrol the movement area, turning at its edges. Chasers close in on a
/// player standing on their area.
pub struct MoveState;

impl State<EnemyState, EnemyBody> for MoveState {
    fn execute(&mut self, body: &mut EnemyBody, dt: f32) -> Transition<EnemyState> {
        if !body.grounded {
            return Transition::Stay;
        }
        let Some(area) = body.area else {
            return Transition::Stay;
        };

        let speed = match body.chase_speed {
            Some(chase) if body.player_on_area() => {
                body.face_player();
                chase
            }
            _ => body.speed,
        };
        body.position.x += body.direction * speed * dt;

        let half = body.half_width();
        if body.position.x - half <= area.left() {
            body.position.x = area.left() + half;
            body.direction = 1.0;
        } else if body.position.x + half >= area.right() {
            body.position.x = area.right() - half;
            body.direction = -1.0;
        }
        Transition::Stay
    }
}

// ---------------------------------------------------------------------------
// Attack
// ---------------------------------------------------------------------------

/// Face the player and strike (or fire) whenever the cooldown allows.
pub struct AttackState;

impl State<EnemyState, EnemyBody> for AttackState {
    fn enter(&mut self, body: &mut EnemyBody) {
        // First attack lands as soon as the player is in reach.
        body.attack_timer = body.attack_cooldown;
    }

    fn execute(&mut self, body: &mut EnemyBody, dt: f32) -> Transition<EnemyState> {
        body.face_player();
        body.attack_timer += dt;
        if body.attack_timer < body.attack_cooldown {
            return Transition::Stay;
        }
        let Some(player) = body.player else {
            return Transition::Stay;
        };
        if body.ranged {
            body.actions.push(EnemyAction::Fire {
                direction: body.direction,
            });
            body.attack_timer = 0.0;
        } else if body.bounds.intersects(&player.bounds) {
            body.actions.push(EnemyAction::Strike);
            body.attack_timer = 0.0;
        }
        Transition::Stay
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn within_radius_attacks_beyond_moves() {
        let enemy = Vec2::new(10.0, 0.0);
        let r = 250.0;
        assert_eq!(decide_state(enemy, enemy, r), EnemyState::Attack);
        assert_eq!(decide_state(enemy, Vec2::new(10.0 + r, 0.0), r), EnemyState::Attack);
        assert_eq!(
            decide_state(enemy, Vec2::new(10.0 + r + 1.0, 0.0), r),
            EnemyState::Move
        );
    }

    fn grounded_body() -> EnemyBody {
        let mut body = EnemyBody::new(Vec2::new(150.0, 100.0), 50.0, false, 0.75);
        body.bounds = Rect::from_center(body.position, Vec2::new(40.0, 40.0));
        body.grounded = true;
        body.area = Some(Rect::new(100.0, 50.0, 200.0, 125.0));
        body
    }

    #[test]
    fn patrol_turns_at_area_edge() {
        let mut body = grounded_body();
        body.direction = -1.0;
        let mut state = MoveState;
        for _ in 0..60 {
            state.execute(&mut body, 0.1);
        }
        assert!(body.position.x - 20.0 >= 100.0);
        assert!(body.position.x + 20.0 <= 300.0);
    }

    #[test]
    fn airborne_enemy_does_not_patrol() {
        let mut body = grounded_body();
        body.grounded = false;
        MoveState.execute(&mut body, 1.0);
        assert_eq!(body.position.x, 150.0);
    }

    #[test]
    fn melee_strikes_only_on_overlap_and_respects_cooldown() {
        let mut body = grounded_body();
        let far = Rect::from_center(Vec2::new(400.0, 100.0), Vec2::new(34.0, 48.0));
        body.player = Some(PlayerSighting {
            position: far.center(),
            bounds: far,
        });
        let mut state = AttackState;
        state.enter(&mut body);
        state.execute(&mut body, 0.0);
        assert!(body.actions.is_empty());

        let near = Rect::from_center(Vec2::new(160.0, 100.0), Vec2::new(34.0, 48.0));
        body.player = Some(PlayerSighting {
            position: near.center(),
            bounds: near,
        });
        state.execute(&mut body, 0.0);
        assert_eq!(body.actions, vec![EnemyAction::Strike]);
        state.execute(&mut body, 0.1);
        assert_eq!(body.actions.len(), 1, "cooldown must gate the next strike");
    }

    #[test]
    fn ranged_fires_toward_player() {
        let mut body = grounded_body();
        body.ranged = true;
        let left = Rect::from_center(Vec2::new(20.0, 100.0), Vec2::new(34.0, 48.0));
        body.player = Some(PlayerSighting {
            position: left.center(),
            bounds: left,
        });
        let mut state = AttackState;
        state.enter(&mut body);
        state.execute(&mut body, 0.0);
        assert_eq!(body.actions, vec![EnemyAction::Fire { direction: -1.0 }]);
    }

    #[test]
    fn chaser_speeds_toward_player_on_its_area() {
        let mut body = grounded_body();
        body.chase_speed = Some(100.0);
        body.direction = -1.0;
        body.player = Some(PlayerSighting {
            position: Vec2::new(280.0, 80.0),
            bounds: Rect::from_center(Vec2::new(280.0, 80.0), Vec2::new(34.0, 48.0)),
        });
        MoveState.execute(&mut body, 0.1);
        assert_eq!(body.direction, 1.0);
        assert!((body.position.x - 160.0).abs() < 1e-3);
    }
}
