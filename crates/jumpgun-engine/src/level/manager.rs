//! Level progression and layout spawning.
//!
//! The manager keeps the level counters, picks the environment for each
//! level, starts layout generation, and turns a finished layout into
//! entities. It listens on the bus for `NextLevel` and `EnemyDeath` and acts
//! on them in [`LevelManager::tick`], once per frame.
//!
//! The ground strip and the start portal only depend on the environment, so
//! the first level spawns them as soon as it begins. Platforms and enemies
//! follow when the layout arrives.
//!
//! Later levels are generated while the current one stays playable. Only a
//! finished layout replaces it: the old world entities go, the counters
//! advance and the new level spawns in one step. A failed generation
//! changes nothing except reopening the exit portal.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::{error, info, warn};

use jumpgun_ecs::entity::EntityId;
use jumpgun_ecs::event::{Inbox, SubscriptionId};
use jumpgun_ecs::geometry::Vec2;

use crate::components::{Collider, Enemy, EnemyKind, Portal, PortalKind, SpriteRenderer};
use crate::config::{GameConfig, LevelConfig, PhysicsConfig};
use crate::event::{accept, EventKind, GameBus, GameEvent};
use crate::scene::{EntityBuilder, Layer, Scene};
use crate::services::Key;

use super::generator::{GenerationRequest, LevelLayout, Theme};
use super::grid::TileGrid;
use super::worker::PendingLevel;
use super::LevelError;

/// Enemy speeds are drawn from this range (px/s).
const ENEMY_SPEED_MIN: f32 = 40.0;
const ENEMY_SPEED_MAX: f32 = 50.0;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Environment {
    pub theme: Theme,
    pub enemy: EnemyKind,
    /// Boss levels hold a single, stronger enemy.
    pub boss: bool,
}

/// Levels at which the environment changes. A level uses the last row at
/// or below it.
const ENVIRONMENTS: [(u32, Environment); 5] = [
    (
        1,
        Environment {
            theme: Theme::Grass,
            enemy: EnemyKind::Mushroom,
            boss: false,
        },
    ),
    (
        7,
        Environment {
            theme: Theme::Desert,
            enemy: EnemyKind::Worm,
            boss: false,
        },
    ),
    (
        12,
        Environment {
            theme: Theme::Desert,
            enemy: EnemyKind::Reaper,
            boss: true,
        },
    ),
    (
        13,
        Environment {
            theme: Theme::Graveyard,
            enemy: EnemyKind::Skeleton,
            boss: false,
        },
    ),
    (
        18,
        Environment {
            theme: Theme::Graveyard,
            enemy: EnemyKind::Skeleton,
            boss: true,
        },
    ),
];

impl Environment {
    pub fn for_level(level: u32) -> Environment {
        ENVIRONMENTS
            .iter()
            .rev()
            .find(|(from, _)| *from <= level)
            .map_or(ENVIRONMENTS[0].1, |(_, env)| *env)
    }
}

/// Counters that move together from one level to the next.
#[derive(Debug, Clone, Copy)]
struct Progress {
    level: u32,
    platform_count: usize,
    enemy_start: u32,
    environment: Environment,
}

// ---------------------------------------------------------------------------
// LevelManager
// ---------------------------------------------------------------------------

pub struct LevelManager {
    config: LevelConfig,
    physics: PhysicsConfig,
    screen_width: f32,
    collider_outlines: bool,
    debug_keys: bool,

    level: u32,
    platform_count: usize,
    enemy_start: u32,
    remaining: i64,
    environment: Environment,
    rng: Pcg64,

    pending: Option<PendingLevel>,
    layout: Option<LevelLayout>,
    exit_spawned: bool,
    /// Pending entities spawned by the manager; live ones are found by layer.
    spawned: Vec<EntityId>,

    next_level: Inbox<()>,
    deaths: Inbox<u32>,
    keys: Inbox<Key>,
    subscriptions: Vec<SubscriptionId>,
}

impl LevelManager {
    pub fn new(config: &GameConfig) -> Self {
        let level = &config.level;
        Self {
            config: level.clone(),
            physics: config.physics.clone(),
            screen_width: config.screen.width,
            collider_outlines: config.debug.collider_outlines,
            debug_keys: config.debug.level_keys,
            level: 1,
            platform_count: level.start_platforms,
            enemy_start: level.start_enemies,
            remaining: i64::from(level.start_enemies),
            environment: Environment::for_level(1),
            rng: Pcg64::seed_from_u64(level.seed),
            pending: None,
            layout: None,
            exit_spawned: false,
            spawned: Vec::new(),
            next_level: Inbox::new(),
            deaths: Inbox::new(),
            keys: Inbox::new(),
            subscriptions: Vec::new(),
        }
    }

    // -- accessors --------------------------------------------------------------

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn platform_count(&self) -> usize {
        self.platform_count
    }

    pub fn enemy_start(&self) -> u32 {
        self.enemy_start
    }

    pub fn remaining_enemies(&self) -> i64 {
        self.remaining
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn layout(&self) -> Option<&LevelLayout> {
        self.layout.as_ref()
    }

    pub fn is_generating(&self) -> bool {
        self.pending.is_some()
    }

    pub fn exit_spawned(&self) -> bool {
        self.exit_spawned
    }

    // -- bus ----------------------------------------------------------------------

    pub fn attach(&mut self, bus: &mut GameBus) {
        if !self.subscriptions.is_empty() {
            return;
        }
        self.subscriptions.push(bus.forward(EventKind::NextLevel, &self.next_level, |_| Some(())));
        self.subscriptions.push(bus.forward(EventKind::EnemyDeath, &self.deaths, |e| {
            accept(e.as_enemy_death()).map(|(_, count)| count)
        }));
        if self.debug_keys {
            self.subscriptions.push(bus.forward(EventKind::KeyPress, &self.keys, |e| {
                accept(e.as_key_press()).and_then(|(key, down)| down.then_some(key))
            }));
        }
    }

    pub fn detach(&mut self, bus: &mut GameBus) {
        for sub in self.subscriptions.drain(..) {
            bus.unsubscribe(sub);
        }
        self.next_level.drain();
        self.deaths.drain();
        self.keys.drain();
    }

    // -- progression ----------------------------------------------------------------

    /// Back to level 1 with the starting counts and the configured seed.
    pub fn reset(&mut self) {
        self.abort_pending();
        self.level = 1;
        self.platform_count = self.config.start_platforms;
        self.enemy_start = self.config.start_enemies;
        self.remaining = i64::from(self.enemy_start);
        self.environment = Environment::for_level(1);
        self.rng = Pcg64::seed_from_u64(self.config.seed);
        self.layout = None;
        self.exit_spawned = false;
        self.spawned.clear();
    }

    /// Begin the current level: ground, start portal, and layout generation.
    pub fn start(&mut self, scene: &mut Scene) {
        info!(level = self.level, platforms = self.platform_count, "level starting");
        self.spawn_frame(scene);
        self.request_generation();
    }

    /// Bump the counters for the next level.
    pub fn advance(&mut self) {
        let next = self.upcoming();
        self.commit(next);
    }

    /// Start building the current level's layout.
    pub fn request_generation(&mut self) {
        self.generate(self.progress());
    }

    /// Start building the next level's layout. The current level stays as
    /// it is until that layout arrives.
    pub fn request_next(&mut self) {
        let next = self.upcoming();
        if self.pending.as_ref().is_some_and(|p| p.level() == next.level) {
            return;
        }
        self.abort_pending();
        info!(level = next.level, platforms = next.platform_count, "next level requested");
        self.generate(next);
    }

    /// Forget an in-flight generation. Its result is discarded.
    pub fn abort_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            info!(level = pending.level(), "level generation abandoned");
        }
    }

    /// Handle this frame's level events and pick up a finished layout.
    ///
    /// Returns the level number when a layout was applied. A failed
    /// generation leaves the current level and its counters in place,
    /// publishes `LevelGenerationFailed`, and is returned as the error.
    pub fn tick(&mut self, scene: &mut Scene) -> Result<Option<u32>, LevelError> {
        for key in self.keys.drain() {
            match key {
                Key::K => {
                    info!(level = self.level, "debug: skipping level");
                    self.request_next();
                }
                Key::L => self.open_exit(scene),
                _ => {}
            }
        }
        if !self.next_level.drain().is_empty() {
            self.request_next();
        }

        let died: u32 = self.deaths.drain().into_iter().sum();
        if died > 0 {
            self.remaining -= i64::from(died);
            if self.remaining <= 0 && self.layout.is_some() {
                self.open_exit(scene);
            }
        }

        let Some(pending) = self.pending.as_mut() else {
            return Ok(None);
        };
        let target = pending.level();
        let Some(result) = pending.poll() else {
            return Ok(None);
        };
        self.pending = None;
        match result {
            Ok(layout) if target == self.level + 1 => {
                self.enter_next(scene, layout);
                Ok(Some(target))
            }
            Ok(layout) if target == self.level && self.layout.is_none() => {
                self.apply(scene, layout);
                Ok(Some(target))
            }
            Ok(_) => {
                warn!(level = target, current = self.level, "dropping stale layout");
                Ok(None)
            }
            Err(e) => {
                error!(level = target, current = self.level, error = %e, "level generation failed");
                scene.publish(&GameEvent::LevelGenerationFailed {
                    level: target,
                    reason: e.to_string(),
                });
                self.reopen_exit(scene);
                Err(e)
            }
        }
    }

    /// Spawn the exit portal (once per level).
    pub fn open_exit(&mut self, scene: &mut Scene) {
        if self.exit_spawned {
            return;
        }
        self.exit_spawned = true;
        info!(level = self.level, "exit portal opened");
        let id = scene.create(Portal::new(PortalKind::Exit).entity(self.config.exit_portal));
        self.spawned.push(id);
    }

    /// Tear down the level's world entities, keeping the player.
    pub fn clean(&mut self, scene: &mut Scene) {
        scene.destroy_where(|e| e.layer() == Layer::World && e.tag() != "player");
        for id in self.spawned.drain(..) {
            if scene.is_pending(id) && !scene.is_pending_destroy(id) {
                let _ = scene.destroy(id);
            }
        }
        self.layout = None;
        self.exit_spawned = false;
    }

    // -- internals ------------------------------------------------------------------

    fn progress(&self) -> Progress {
        Progress {
            level: self.level,
            platform_count: self.platform_count,
            enemy_start: self.enemy_start,
            environment: self.environment,
        }
    }

    fn upcoming(&self) -> Progress {
        let level = self.level + 1;
        let enemy_start = if level % 2 != 0 {
            self.enemy_start + 1
        } else {
            self.enemy_start
        };
        Progress {
            level,
            platform_count: (self.platform_count + 1).min(self.config.max_platforms),
            enemy_start,
            environment: Environment::for_level(level),
        }
    }

    fn commit(&mut self, progress: Progress) {
        self.level = progress.level;
        self.platform_count = progress.platform_count;
        self.enemy_start = progress.enemy_start;
        self.remaining = i64::from(progress.enemy_start);
        self.environment = progress.environment;
    }

    fn generate(&mut self, progress: Progress) {
        let request = GenerationRequest {
            level: progress.level,
            platform_count: progress.platform_count,
            enemy_count: if progress.environment.boss { 1 } else { progress.enemy_start },
            theme: progress.environment.theme,
            seed: self.rng.gen(),
            grid: TileGrid::from_config(&self.config),
        };
        let pending = if self.config.background_generation {
            match PendingLevel::spawn(request.clone()) {
                Ok(pending) => pending,
                Err(e) => {
                    warn!(level = progress.level, error = %e, "generating level inline");
                    PendingLevel::inline(request)
                }
            }
        } else {
            PendingLevel::inline(request)
        };
        self.pending = Some(pending);
    }

    /// Swap the finished next level in for the current one.
    fn enter_next(&mut self, scene: &mut Scene, layout: LevelLayout) {
        self.advance();
        self.clean(scene);
        if let Some(player) = scene.find_by_tag("player").map(|p| p.id()) {
            if let Some(entity) = scene.entity_mut(player) {
                entity.transform.position = self.config.spawn_point;
            }
        }
        info!(level = self.level, platforms = self.platform_count, "level starting");
        self.spawn_frame(scene);
        self.apply(scene, layout);
    }

    /// After a failed transition the exit portal has already closed. Put it
    /// back so the player can try again.
    fn reopen_exit(&mut self, scene: &mut Scene) {
        if !self.exit_spawned {
            return;
        }
        let open = scene.live_entities().any(|e| {
            !scene.is_pending_destroy(e.id())
                && e.get::<Portal>().is_some_and(|p| p.kind() == PortalKind::Exit)
        });
        if !open {
            self.exit_spawned = false;
            self.open_exit(scene);
        }
    }

    fn spawn_frame(&mut self, scene: &mut Scene) {
        let theme = self.environment.theme;
        let ground = EntityBuilder::new("ground")
            .at(Vec2::new(self.screen_width / 2.0, self.config.ground_y))
            .with(SpriteRenderer::new(theme.ground_sprite()))
            .with(Collider::with_outline(self.collider_outlines));
        let portal = Portal::new(PortalKind::Start).entity(self.config.spawn_point);
        self.spawned.push(scene.create(ground));
        self.spawned.push(scene.create(portal));
    }

    fn apply(&mut self, scene: &mut Scene, layout: LevelLayout) {
        let theme = layout.theme;
        for tile in &layout.platforms {
            let platform = EntityBuilder::new("platform")
                .at(tile.center())
                .with(SpriteRenderer::new(theme.platform_sprite()))
                .with(Collider::with_outline(self.collider_outlines));
            self.spawned.push(scene.create(platform));
        }

        let env = self.environment;
        for spawn in &layout.enemy_spawns {
            let speed = self.rng.gen_range(ENEMY_SPEED_MIN..=ENEMY_SPEED_MAX);
            let mut enemy = Enemy::new(env.enemy, speed, layout.movement_areas.clone(), self.physics.clone());
            if env.boss {
                enemy = enemy.into_boss();
            }
            self.spawned.push(scene.create(enemy.entity(*spawn, self.collider_outlines)));
        }
        self.remaining = layout.enemy_spawns.len() as i64;

        info!(
            level = layout.level,
            platforms = layout.platforms.len(),
            enemies = layout.enemy_spawns.len(),
            fingerprint = %layout.fingerprint(),
            "level ready"
        );
        let level = layout.level;
        self.layout = Some(layout);
        scene.publish(&GameEvent::LevelReady { level });
    }
}

impl std::fmt::Debug for LevelManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelManager")
            .field("level", &self.level)
            .field("platform_count", &self.platform_count)
            .field("enemy_start", &self.enemy_start)
            .field("remaining", &self.remaining)
            .field("environment", &self.environment)
            .field("pending", &self.pending)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
