//! Hostile actors.
//!
//! Every enemy kind shares one component; the kind only selects a row of the
//! stats table and a sprite. Behaviour comes from the Move/Attack machine in
//! [`crate::ai`], which works on an [`EnemyBody`] mirror of the entity. The
//! component copies the transform into the body, runs the machine, then
//! writes the position back and turns queued actions into events and
//! projectiles.

use tracing::{debug, error, info};

use jumpgun_ecs::component::ComponentKind;
use jumpgun_ecs::event::{Inbox, SubscriptionId};
use jumpgun_ecs::geometry::{Rect, Vec2};

use crate::ai::{decide_state, enemy_machine, EnemyAction, EnemyBody, EnemyMachine, EnemyState, PlayerSighting};
use crate::collision::{Contact, GroundOutcome, GroundTracker};
use crate::config::PhysicsConfig;
use crate::event::{accept, EventKind, GameEvent};
use crate::scene::{Component, EntityBuilder, FrameContext};

use super::{Collider, Faction, Projectile, SpriteRenderer};

const SUPPORT_TAGS: [&str; 2] = ["ground", "platform"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnemyKind {
    Mushroom,
    Worm,
    Skeleton,
    Reaper,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyStats {
    pub health: i32,
    pub damage: i32,
    /// Attack radius. `None` uses the sprite's width.
    pub detection: Option<f32>,
    pub attack_cooldown: f32,
    pub ranged: bool,
    pub chase_speed: Option<f32>,
    pub projectile_speed: f32,
}

impl EnemyStats {
    /// Boss variant of a regular row: tougher and harder-hitting.
    pub fn boss(self) -> Self {
        Self {
            health: self.health * 5,
            damage: self.damage * 2,
            ..self
        }
    }
}

impl EnemyKind {
    pub fn stats(self) -> EnemyStats {
        match self {
            EnemyKind::Mushroom => EnemyStats {
                health: 60,
                damage: 15,
                detection: Some(60.0),
                attack_cooldown: 1.0,
                ranged: false,
                chase_speed: None,
                projectile_speed: 0.0,
            },
            EnemyKind::Worm => EnemyStats {
                health: 40,
                damage: 20,
                detection: Some(250.0),
                attack_cooldown: 0.75,
                ranged: true,
                chase_speed: None,
                projectile_speed: 150.0,
            },
            EnemyKind::Skeleton => EnemyStats {
                health: 100,
                damage: 20,
                detection: None,
                attack_cooldown: 1.0,
                ranged: false,
                chase_speed: Some(100.0),
                projectile_speed: 0.0,
            },
            EnemyKind::Reaper => EnemyStats {
                health: 80,
                damage: 25,
                detection: Some(400.0),
                attack_cooldown: 1.5,
                ranged: true,
                chase_speed: None,
                projectile_speed: 200.0,
            },
        }
    }

    pub fn sprite(self) -> &'static str {
        match self {
            EnemyKind::Mushroom => "mushroom",
            EnemyKind::Worm => "worm",
            EnemyKind::Skeleton => "skeleton",
            EnemyKind::Reaper => "reaper",
        }
    }
}

pub struct Enemy {
    kind: EnemyKind,
    stats: EnemyStats,
    boss: bool,
    health: i32,
    physics: PhysicsConfig,
    gravity_pull: f32,
    ground: GroundTracker,
    movement_areas: Vec<Rect>,
    body: EnemyBody,
    machine: EnemyMachine,
    dead: bool,
    hits: Inbox<i32>,
    contacts: Inbox<Contact>,
    subscriptions: Vec<SubscriptionId>,
}

impl Enemy {
    /// `movement_areas` are the level's merged platform rectangles; the enemy
    /// patrols whichever one it lands in.
    pub fn new(kind: EnemyKind, speed: f32, movement_areas: Vec<Rect>, physics: PhysicsConfig) -> Self {
        let stats = kind.stats();
        let mut body = EnemyBody::new(Vec2::ZERO, speed, stats.ranged, stats.attack_cooldown);
        body.chase_speed = stats.chase_speed;
        Self {
            kind,
            stats,
            boss: false,
            health: stats.health,
            gravity_pull: physics.initial_pull,
            ground: GroundTracker::new(physics.landing_tolerance, physics.side_push),
            physics,
            movement_areas,
            body,
            machine: enemy_machine(),
            dead: false,
            hits: Inbox::new(),
            contacts: Inbox::new(),
            subscriptions: Vec::new(),
        }
    }

    pub fn into_boss(mut self) -> Self {
        self.boss = true;
        self.stats = self.stats.boss();
        self.health = self.stats.health;
        self
    }

    pub fn entity(self, position: Vec2, collider_outline: bool) -> EntityBuilder {
        EntityBuilder::new("enemy")
            .at(position)
            .with(SpriteRenderer::new(self.kind.sprite()))
            .with(Collider::with_outline(collider_outline))
            .with(self)
    }

    pub fn kind(&self) -> EnemyKind {
        self.kind
    }

    pub fn is_boss(&self) -> bool {
        self.boss
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn state(&self) -> Option<EnemyState> {
        self.machine.current()
    }

    pub fn movement_area(&self) -> Option<Rect> {
        self.body.area
    }

    pub fn is_grounded(&self) -> bool {
        self.ground.is_grounded()
    }

    fn take_hits(&mut self, ctx: &mut FrameContext<'_>) {
        let damage: i32 = self.hits.drain().into_iter().sum();
        if damage == 0 {
            return;
        }
        self.health -= damage;
        debug!(entity = %ctx.id(), damage, health = self.health, "enemy hit");
        if self.health <= 0 {
            self.dead = true;
            info!(entity = %ctx.id(), kind = ?self.kind, boss = self.boss, "enemy died");
            ctx.services().play_random_sfx("enemy_death");
            ctx.publish(&GameEvent::EnemyDeath {
                enemy: ctx.id(),
                count: 1,
            });
            ctx.destroy_self();
        }
    }

    fn settle(&mut self, own: Rect) {
        let supports: Vec<Rect> = self
            .contacts
            .drain()
            .into_iter()
            .filter(|c| SUPPORT_TAGS.contains(&c.with_tag.as_str()))
            .map(|c| c.with_box)
            .collect();
        if self.ground.settle(own, &supports) == GroundOutcome::Landed {
            self.gravity_pull = self.physics.initial_pull;
            // New surface, new patrol range.
            self.body.area = None;
        }
        self.body.grounded = self.ground.is_grounded();
    }

    fn apply_gravity(&mut self, dt: f32) {
        if self.body.grounded {
            return;
        }
        self.gravity_pull += dt * self.physics.gravity_multiplier;
        self.body.position.y += self.gravity_pull * dt;
    }

    /// The merged rectangle under the enemy, found once per landing.
    fn find_area(&mut self) {
        if !self.body.grounded || self.body.area.is_some() {
            return;
        }
        let position = self.body.position;
        self.body.area = self
            .movement_areas
            .iter()
            .copied()
            .find(|area| area.contains_point(position));
    }

    fn sight_player(&mut self, ctx: &FrameContext<'_>) {
        self.body.player = ctx.find_by_tag("player").and_then(|p| {
            p.bounding_box().map(|bounds| PlayerSighting {
                position: p.position(),
                bounds,
            })
        });
    }

    fn run_machine(&mut self, ctx: &FrameContext<'_>) {
        let radius = self
            .stats
            .detection
            .or_else(|| ctx.extent().map(|e| e.x))
            .unwrap_or(0.0);
        let wanted = match self.body.player {
            Some(player) => decide_state(self.body.position, player.position, radius),
            None => EnemyState::Move,
        };
        if let Err(e) = self.machine.change_state(wanted, &mut self.body) {
            error!(entity = %ctx.id(), error = %e, "enemy state change failed");
            return;
        }
        if let Err(e) = self.machine.execute(&mut self.body, ctx.dt()) {
            error!(entity = %ctx.id(), error = %e, "enemy state failed");
        }
    }

    fn apply_actions(&mut self, ctx: &mut FrameContext<'_>) {
        for action in std::mem::take(&mut self.body.actions) {
            match action {
                EnemyAction::Strike => {
                    ctx.publish(&GameEvent::EnemyAttack {
                        enemy: ctx.id(),
                        damage: self.stats.damage,
                        ranged: false,
                    });
                }
                EnemyAction::Fire { direction } => {
                    let velocity = Vec2::new(direction * self.stats.projectile_speed, 0.0);
                    let shot = Projectile::new(Faction::Enemy, ctx.id(), velocity, self.stats.damage);
                    ctx.instantiate(shot.entity(ctx.position()));
                }
            }
        }
    }
}

impl Component for Enemy {
    fn requires(&self) -> Vec<ComponentKind> {
        vec![
            ComponentKind::of::<SpriteRenderer>(),
            ComponentKind::of::<Collider>(),
        ]
    }

    fn start(&mut self, ctx: &mut FrameContext<'_>) {
        let me = ctx.id();
        let subs = [
            ctx.forward(EventKind::EnemyHit, &self.hits, move |e| {
                accept(e.as_enemy_hit()).and_then(|(enemy, damage)| (enemy == me).then_some(damage))
            }),
            ctx.forward(EventKind::Collision, &self.contacts, move |e| {
                accept(e.as_contact()).filter(|c| c.from == me).cloned()
            }),
        ];
        self.subscriptions.extend(subs);
        if let Err(e) = self.machine.start(EnemyState::Move, &mut self.body) {
            error!(entity = %me, error = %e, "enemy machine failed to start");
        }
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        if self.dead {
            return;
        }
        self.take_hits(ctx);
        if self.dead {
            return;
        }

        let Some(own) = ctx.bounding_box() else {
            return;
        };
        self.body.position = ctx.position();
        self.body.bounds = own;

        self.settle(own);
        self.apply_gravity(ctx.dt());
        self.find_area();
        self.sight_player(ctx);
        self.run_machine(ctx);

        ctx.set_position(self.body.position);
        self.apply_actions(ctx);

        let facing_left = self.body.direction < 0.0;
        if let Some(sprite) = ctx.sibling_mut::<SpriteRenderer>() {
            sprite.flip_horizontal = facing_left;
        }
    }

    fn on_destroy(&mut self, ctx: &mut FrameContext<'_>) {
        for sub in self.subscriptions.drain(..) {
            ctx.unsubscribe(sub);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worm_row_matches_the_shipped_game() {
        let worm = EnemyKind::Worm.stats();
        assert_eq!(worm.health, 40);
        assert_eq!(worm.damage, 20);
        assert_eq!(worm.detection, Some(250.0));
        assert!(worm.ranged);
    }

    #[test]
    fn boss_scales_health_and_damage() {
        let enemy = Enemy::new(EnemyKind::Skeleton, 45.0, Vec::new(), PhysicsConfig::default()).into_boss();
        assert!(enemy.is_boss());
        assert_eq!(enemy.health(), 500);
        assert_eq!(enemy.stats.damage, 40);
        assert_eq!(enemy.stats.chase_speed, Some(100.0));
    }

    #[test]
    fn skeleton_detection_falls_back_to_sprite_width() {
        assert_eq!(EnemyKind::Skeleton.stats().detection, None);
    }
}
