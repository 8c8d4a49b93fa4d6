//! The player-controlled soldier.
//!
//! Input arrives as re-published `KeyPress` events; ground contact arrives
//! as `Collision` events. Both are forwarded into inboxes on `start` and
//! drained at the top of `update`, so the player reacts to what happened
//! since its previous update.

use std::collections::HashSet;

use tracing::{debug, info};

use jumpgun_ecs::component::ComponentKind;
use jumpgun_ecs::event::{Inbox, SubscriptionId};
use jumpgun_ecs::geometry::{Rect, Vec2};

use crate::collision::{Contact, GroundOutcome, GroundTracker};
use crate::config::{PhysicsConfig, PlayerConfig};
use crate::event::{accept, EventKind, GameEvent};
use crate::scene::{Component, EntityBuilder, FrameContext};
use crate::services::Key;

use super::{Collider, Faction, Projectile, SpriteRenderer};

/// Tags the player can stand on.
const SUPPORT_TAGS: [&str; 2] = ["ground", "platform"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Character {
    Soldier,
    Ranger,
}

impl Character {
    pub fn sprite(self) -> &'static str {
        match self {
            Character::Soldier => "player1",
            Character::Ranger => "player2",
        }
    }
}

pub struct Player {
    character: Character,
    stats: PlayerConfig,
    physics: PhysicsConfig,
    screen_width: f32,
    health: i32,
    level: u32,
    jump_count: u32,
    gravity_pull: f32,
    dash_timer: f32,
    shoot_timer: f32,
    facing: f32,
    held: HashSet<Key>,
    ground: GroundTracker,
    dead: bool,
    keys: Inbox<(Key, bool)>,
    contacts: Inbox<Contact>,
    attacks: Inbox<i32>,
    levels: Inbox<u32>,
    subscriptions: Vec<SubscriptionId>,
}

impl Player {
    pub fn new(
        character: Character,
        stats: PlayerConfig,
        physics: PhysicsConfig,
        screen_width: f32,
    ) -> Self {
        Self {
            character,
            health: stats.health,
            ground: GroundTracker::new(physics.landing_tolerance, physics.side_push),
            gravity_pull: physics.initial_pull,
            stats,
            physics,
            screen_width,
            level: 1,
            jump_count: 0,
            dash_timer: 0.0,
            shoot_timer: 0.0,
            facing: 1.0,
            held: HashSet::new(),
            dead: false,
            keys: Inbox::new(),
            contacts: Inbox::new(),
            attacks: Inbox::new(),
            levels: Inbox::new(),
            subscriptions: Vec::new(),
        }
    }

    /// A complete player entity at `spawn`.
    pub fn entity(self, spawn: Vec2, collider_outline: bool) -> EntityBuilder {
        EntityBuilder::new("player")
            .at(spawn)
            .with(SpriteRenderer::new(self.character.sprite()))
            .with(Collider::with_outline(collider_outline))
            .with(self)
    }

    pub fn character(&self) -> Character {
        self.character
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn jump_count(&self) -> u32 {
        self.jump_count
    }

    pub fn is_grounded(&self) -> bool {
        self.ground.is_grounded()
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    fn read_keys(&mut self) -> Vec<Key> {
        let mut pressed = Vec::new();
        for (key, down) in self.keys.drain() {
            if down {
                if self.held.insert(key) {
                    pressed.push(key);
                }
            } else {
                self.held.remove(&key);
            }
        }
        pressed
    }

    fn resolve_ground(&mut self, ctx: &mut FrameContext<'_>, own: Rect) {
        let supports: Vec<Rect> = self
            .contacts
            .drain()
            .into_iter()
            .filter(|c| SUPPORT_TAGS.contains(&c.with_tag.as_str()))
            .map(|c| c.with_box)
            .collect();
        match self.ground.check(own, &supports) {
            GroundOutcome::Landed => {
                self.jump_count = 0;
                self.gravity_pull = self.physics.initial_pull;
                debug!(entity = %ctx.id(), "player landed");
            }
            GroundOutcome::Pushed(dx) => ctx.translate(Vec2::new(dx, 0.0)),
            GroundOutcome::Grounded | GroundOutcome::Airborne => {}
        }
    }

    fn take_damage(&mut self, ctx: &mut FrameContext<'_>) {
        for level in self.levels.drain() {
            self.level = level;
        }
        let damage: i32 = self.attacks.drain().into_iter().sum();
        if damage == 0 || self.dead {
            return;
        }
        self.health -= damage;
        ctx.services().play_random_sfx("player_hurt");
        if self.health <= 0 {
            self.dead = true;
            info!(level = self.level, "player died");
            ctx.publish(&GameEvent::PlayerDeath { level: self.level });
            ctx.destroy_self();
        }
    }

    fn handle_input(&mut self, ctx: &mut FrameContext<'_>, pressed: &[Key]) {
        let dt = ctx.dt();
        let mut dx = 0.0;
        if self.held.contains(&Key::A) {
            dx -= 1.0;
        }
        if self.held.contains(&Key::D) {
            dx += 1.0;
        }
        if dx != 0.0 {
            self.facing = dx;
            ctx.translate(Vec2::new(dx * self.stats.speed * dt, 0.0));
        }

        for key in pressed {
            match key {
                Key::Space if self.jump_count < self.stats.max_jumps => {
                    self.jump_count += 1;
                    self.ground.release();
                    ctx.translate(Vec2::new(0.0, -self.stats.jump_height));
                    ctx.services().play_sfx("jump");
                }
                Key::LeftShift if self.dash_timer <= 0.0 => {
                    self.dash_timer = self.stats.dash_cooldown;
                    ctx.translate(Vec2::new(self.facing * self.stats.dash_strength, 0.0));
                }
                Key::E if self.shoot_timer <= 0.0 => {
                    self.shoot_timer = self.stats.shoot_cooldown;
                    let velocity = Vec2::new(self.facing * self.stats.projectile_speed, 0.0);
                    let shot = Projectile::new(
                        Faction::Player,
                        ctx.id(),
                        velocity,
                        self.stats.projectile_damage,
                    );
                    ctx.instantiate(shot.entity(ctx.position()));
                    ctx.services().play_sfx("shoot");
                }
                _ => {}
            }
        }

        if let Some(sprite) = ctx.sibling_mut::<SpriteRenderer>() {
            sprite.flip_horizontal = self.facing < 0.0;
        }
    }

    fn apply_gravity(&mut self, ctx: &mut FrameContext<'_>) {
        if self.ground.is_grounded() {
            return;
        }
        let dt = ctx.dt();
        self.gravity_pull += dt * self.physics.gravity_multiplier;
        ctx.translate(Vec2::new(0.0, self.gravity_pull * dt));
    }

    fn clamp_to_screen(&self, ctx: &mut FrameContext<'_>) {
        let half = ctx.extent().map_or(0.0, |e| e.x / 2.0);
        let mut pos = ctx.position();
        pos.x = pos.x.clamp(half, (self.screen_width - half).max(half));
        ctx.set_position(pos);
    }
}

impl Component for Player {
    fn requires(&self) -> Vec<ComponentKind> {
        vec![
            ComponentKind::of::<SpriteRenderer>(),
            ComponentKind::of::<Collider>(),
        ]
    }

    fn start(&mut self, ctx: &mut FrameContext<'_>) {
        let me = ctx.id();
        let subs = [
            ctx.forward(EventKind::KeyPress, &self.keys, |e| accept(e.as_key_press())),
            ctx.forward(EventKind::Collision, &self.contacts, move |e| {
                accept(e.as_contact()).filter(|c| c.from == me).cloned()
            }),
            ctx.forward(EventKind::EnemyAttack, &self.attacks, |e| {
                accept(e.as_enemy_attack()).map(|(_, damage, _)| damage)
            }),
            ctx.forward(EventKind::LevelReady, &self.levels, |e| {
                accept(e.as_level_ready())
            }),
        ];
        self.subscriptions.extend(subs);
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        if self.dead {
            return;
        }
        self.take_damage(ctx);
        if self.dead {
            return;
        }

        let dt = ctx.dt();
        self.dash_timer = (self.dash_timer - dt).max(0.0);
        self.shoot_timer = (self.shoot_timer - dt).max(0.0);

        if let Some(own) = ctx.bounding_box() {
            self.resolve_ground(ctx, own);
        }
        let pressed = self.read_keys();
        self.handle_input(ctx, &pressed);
        self.apply_gravity(ctx);
        self.clamp_to_screen(ctx);
    }

    fn on_destroy(&mut self, ctx: &mut FrameContext<'_>) {
        for sub in self.subscriptions.drain(..) {
            ctx.unsubscribe(sub);
        }
    }
}
