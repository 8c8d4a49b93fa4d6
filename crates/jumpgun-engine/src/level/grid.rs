use serde::{Deserialize, Serialize};

use jumpgun_ecs::geometry::{Rect, Vec2};

use crate::config::LevelConfig;

/// Fixed grid of equally sized tiles. Row 0 is the top row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileGrid {
    pub columns: u32,
    pub rows: u32,
    pub tile_size: Vec2,
    /// Top-left corner of tile (0, 0).
    pub origin: Vec2,
}

impl TileGrid {
    pub fn new(columns: u32, rows: u32, tile_size: Vec2, origin: Vec2) -> Self {
        Self {
            columns,
            rows,
            tile_size,
            origin,
        }
    }

    pub fn from_config(level: &LevelConfig) -> Self {
        Self::new(
            level.grid_columns,
            level.grid_rows,
            Vec2::new(level.tile_width, level.tile_height),
            Vec2::new(0.0, level.grid_top),
        )
    }

    pub fn capacity(&self) -> usize {
        (self.columns as usize).saturating_mul(self.rows as usize)
    }

    pub fn contains(&self, column: u32, row: u32) -> bool {
        column < self.columns && row < self.rows
    }

    pub fn tile_rect(&self, column: u32, row: u32) -> Rect {
        Rect::new(
            self.origin.x + column as f32 * self.tile_size.x,
            self.origin.y + row as f32 * self.tile_size.y,
            self.tile_size.x,
            self.tile_size.y,
        )
    }

    /// The up-to-eight cells around `(column, row)`, in row-major order.
    pub fn neighbours(&self, column: u32, row: u32) -> Vec<(u32, u32)> {
        let mut out = Vec::with_capacity(8);
        for dr in -1i64..=1 {
            for dc in -1i64..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                let (c, r) = (column as i64 + dc, row as i64 + dr);
                if c >= 0 && r >= 0 && self.contains(c as u32, r as u32) {
                    out.push((c as u32, r as u32));
                }
            }
        }
        out
    }
}
