//! Game configuration.
//!
//! Every tunable the core reads lives in [`GameConfig`]. All sections default
//! to the shipped game's values, so an empty JSON object is a valid config and
//! a file only needs to list what it overrides.
//!
//! ```
//! use jumpgun_engine::config::GameConfig;
//!
//! let cfg = GameConfig::from_json(r#"{ "level": { "seed": 7 } }"#).unwrap();
//! assert_eq!(cfg.level.seed, 7);
//! assert_eq!(cfg.level.start_platforms, 4);
//! ```

use serde::{Deserialize, Serialize};

use jumpgun_ecs::geometry::Vec2;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Gravity and contact resolution shared by the player and enemies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Fall speed (px/s) right after leaving the ground.
    pub initial_pull: f32,
    /// How fast the fall speed grows (px/s per second).
    pub gravity_multiplier: f32,
    /// Maximum bottom-edge penetration (px) that still counts as landing.
    pub landing_tolerance: f32,
    /// Horizontal shove (px) applied when running into a platform's side.
    pub side_push: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            initial_pull: 50.0,
            gravity_multiplier: 100.0,
            landing_tolerance: 5.0,
            side_push: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub speed: f32,
    pub jump_height: f32,
    pub max_jumps: u32,
    pub dash_strength: f32,
    pub dash_cooldown: f32,
    pub shoot_cooldown: f32,
    pub health: i32,
    pub projectile_speed: f32,
    pub projectile_damage: i32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: 100.0,
            jump_height: 100.0,
            max_jumps: 2,
            dash_strength: 50.0,
            dash_cooldown: 0.5,
            shoot_cooldown: 2.0,
            health: 120,
            projectile_speed: 400.0,
            projectile_damage: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelConfig {
    pub start_platforms: usize,
    pub max_platforms: usize,
    pub start_enemies: u32,
    pub grid_columns: u32,
    pub grid_rows: u32,
    pub tile_width: f32,
    pub tile_height: f32,
    /// Screen y of the top edge of the first tile row.
    pub grid_top: f32,
    /// Screen y of the ground strip's centre.
    pub ground_y: f32,
    pub spawn_point: Vec2,
    pub exit_portal: Vec2,
    /// Build layouts on a worker thread. `false` generates inline.
    pub background_generation: bool,
    pub seed: u64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            start_platforms: 4,
            max_platforms: 19,
            start_enemies: 2,
            grid_columns: 6,
            grid_rows: 4,
            tile_width: 213.0,
            tile_height: 125.0,
            grid_top: 130.0,
            ground_y: 745.0,
            spawn_point: Vec2::new(40.0, 705.0),
            exit_portal: Vec2::new(1210.0, 700.0),
            background_generation: true,
            seed: 0x4A55_4D50,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// `K` skips to the next level, `L` opens the exit portal.
    pub level_keys: bool,
    pub collider_outlines: bool,
    /// Filter used by [`crate::logging::init`] when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            level_keys: false,
            collider_outlines: false,
            log_filter: "warn".to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub screen: ScreenConfig,
    pub physics: PhysicsConfig,
    pub player: PlayerConfig,
    pub level: LevelConfig,
    pub debug: DebugConfig,
}

impl GameConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: GameConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be positive and finite, got {value}"),
                })
            }
        }

        positive("screen.width", self.screen.width)?;
        positive("screen.height", self.screen.height)?;
        positive("level.tile_width", self.level.tile_width)?;
        positive("level.tile_height", self.level.tile_height)?;
        positive("physics.gravity_multiplier", self.physics.gravity_multiplier)?;

        if self.physics.landing_tolerance < 0.0 {
            return Err(ConfigError::Invalid {
                field: "physics.landing_tolerance",
                reason: "must not be negative".to_owned(),
            });
        }
        if self.player.max_jumps == 0 {
            return Err(ConfigError::Invalid {
                field: "player.max_jumps",
                reason: "must allow at least one jump".to_owned(),
            });
        }

        let level = &self.level;
        if level.grid_columns == 0 || level.grid_rows == 0 {
            return Err(ConfigError::Invalid {
                field: "level.grid_columns",
                reason: "grid must have at least one row and one column".to_owned(),
            });
        }
        if level.start_platforms == 0 {
            return Err(ConfigError::Invalid {
                field: "level.start_platforms",
                reason: "a level needs at least one platform".to_owned(),
            });
        }
        if level.max_platforms < level.start_platforms {
            return Err(ConfigError::Invalid {
                field: "level.max_platforms",
                reason: format!(
                    "cap {} is below the starting count {}",
                    level.max_platforms, level.start_platforms
                ),
            });
        }
        let capacity = (level.grid_columns as usize)
            .checked_mul(level.grid_rows as usize)
            .ok_or_else(|| ConfigError::Invalid {
                field: "level.grid_columns",
                reason: format!(
                    "{}x{} grid is too large",
                    level.grid_columns, level.grid_rows
                ),
            })?;
        if level.max_platforms > capacity {
            return Err(ConfigError::Invalid {
                field: "level.max_platforms",
                reason: format!("cap {} exceeds grid capacity {capacity}", level.max_platforms),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
