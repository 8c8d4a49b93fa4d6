//! Seeded platform placement.
//!
//! Platforms grow upward from the bottom row of the tile grid: every new
//! platform goes on a free cell that is either in the bottom row or next to
//! (including diagonally) an already placed one, so each platform is within
//! a jump of another. The strict pass also keeps headroom by refusing cells
//! directly above or below a placed platform; when that cannot fit the
//! requested count, [`generate_with_retry`] falls back to the relaxed rule.
//!
//! Everything here is plain data and a local RNG, so a request can be sent to
//! a worker thread and the same request always yields the same layout.

use std::collections::BTreeSet;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use jumpgun_ecs::geometry::{Rect, Vec2};

use super::grid::TileGrid;
use super::LevelError;

/// Height above a platform's tile centre at which enemies are dropped in.
const SPAWN_DROP: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theme {
    Grass,
    Desert,
    Graveyard,
}

impl Theme {
    pub fn platform_sprite(self) -> &'static str {
        match self {
            Theme::Grass => "platform_grass",
            Theme::Desert => "platform_desert",
            Theme::Graveyard => "platform_graveyard",
        }
    }

    pub fn ground_sprite(self) -> &'static str {
        match self {
            Theme::Grass => "ground_grass",
            Theme::Desert => "ground_desert",
            Theme::Graveyard => "ground_graveyard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub level: u32,
    pub platform_count: usize,
    pub enemy_count: u32,
    pub theme: Theme,
    pub seed: u64,
    pub grid: TileGrid,
}

/// A finished level: where platforms go, the merged areas enemies patrol,
/// and where enemies are dropped in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    pub level: u32,
    pub theme: Theme,
    /// Tile rectangles holding a platform, in placement order.
    pub platforms: Vec<Rect>,
    pub movement_areas: Vec<Rect>,
    pub enemy_spawns: Vec<Vec2>,
    pub seed: u64,
}

impl LevelLayout {
    /// BLAKE3 hex digest of the layout's JSON form.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&bytes).to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Place `request.platform_count` platforms.
///
/// `relaxed` drops the headroom rule. Fails with
/// [`LevelError::NoValidPlacement`] when the rules run out of free cells.
pub fn generate(request: &GenerationRequest, relaxed: bool) -> Result<LevelLayout, LevelError> {
    let grid = &request.grid;
    let capacity = grid.capacity();
    if request.platform_count == 0 {
        return Err(LevelError::InvalidRequest {
            reason: "a level needs at least one platform".to_owned(),
        });
    }
    if request.platform_count > capacity {
        return Err(LevelError::NoValidPlacement {
            requested: request.platform_count,
            placed: 0,
            capacity,
        });
    }

    let mut rng = Pcg64::seed_from_u64(request.seed);
    let mut placed: Vec<(u32, u32)> = Vec::with_capacity(request.platform_count);
    let mut occupied: BTreeSet<(u32, u32)> = BTreeSet::new();

    while placed.len() < request.platform_count {
        let candidates = frontier(grid, &occupied, relaxed);
        if candidates.is_empty() {
            return Err(LevelError::NoValidPlacement {
                requested: request.platform_count,
                placed: placed.len(),
                capacity,
            });
        }
        let pick = candidates[rng.gen_range(0..candidates.len())];
        occupied.insert(pick);
        placed.push(pick);
    }

    let platforms: Vec<Rect> = placed
        .iter()
        .map(|&(column, row)| grid.tile_rect(column, row))
        .collect();
    let movement_areas = merge_adjacent(&platforms);
    let enemy_spawns = spawn_points(&platforms, request.enemy_count, &mut rng);

    debug!(
        level = request.level,
        platforms = platforms.len(),
        areas = movement_areas.len(),
        relaxed,
        "layout generated"
    );
    Ok(LevelLayout {
        level: request.level,
        theme: request.theme,
        platforms,
        movement_areas,
        enemy_spawns,
        seed: request.seed,
    })
}

/// Strict placement first, then one relaxed attempt with the same seed.
pub fn generate_with_retry(request: &GenerationRequest) -> Result<LevelLayout, LevelError> {
    match generate(request, false) {
        Ok(layout) => Ok(layout),
        Err(LevelError::NoValidPlacement { placed, .. }) => {
            debug!(
                level = request.level,
                requested = request.platform_count,
                placed,
                "strict placement ran out of cells, retrying relaxed"
            );
            generate(request, true)
        }
        Err(e) => Err(e),
    }
}

/// Free cells the next platform may go on, in a stable order.
fn frontier(grid: &TileGrid, occupied: &BTreeSet<(u32, u32)>, relaxed: bool) -> Vec<(u32, u32)> {
    let bottom = grid.rows - 1;
    let mut cells: BTreeSet<(u32, u32)> = (0..grid.columns).map(|c| (c, bottom)).collect();
    for &(c, r) in occupied {
        cells.extend(grid.neighbours(c, r));
    }
    cells
        .into_iter()
        .filter(|cell| !occupied.contains(cell))
        .filter(|&(c, r)| {
            relaxed
                || !(occupied.contains(&(c, r + 1)) || (r > 0 && occupied.contains(&(c, r - 1))))
        })
        .collect()
}

/// Enemies start above random platforms. More enemies than platforms share
/// platforms, spread sideways.
fn spawn_points(platforms: &[Rect], count: u32, rng: &mut Pcg64) -> Vec<Vec2> {
    if platforms.is_empty() {
        return Vec::new();
    }
    let mut order: Vec<usize> = (0..platforms.len()).collect();
    for i in (1..order.len()).rev() {
        let j = rng.gen_range(0..=i);
        order.swap(i, j);
    }
    (0..count as usize)
        .map(|n| {
            let tile = platforms[order[n % order.len()]];
            let lap = (n / order.len()) as f32;
            let spread = (lap * 30.0).min(tile.width / 2.0 - 20.0).max(0.0);
            let centre = tile.center();
            Vec2::new(centre.x - spread, centre.y - SPAWN_DROP)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Union every pair of rectangles that share a row and abut horizontally,
/// until nothing merges. The result is sorted by top, then left.
pub fn merge_adjacent(rects: &[Rect]) -> Vec<Rect> {
    let mut areas: Vec<Rect> = rects.to_vec();
    loop {
        let pair = (0..areas.len()).find_map(|i| {
            (i + 1..areas.len())
                .find(|&j| abuts(&areas[i], &areas[j]))
                .map(|j| (i, j))
        });
        let Some((i, j)) = pair else {
            break;
        };
        let merged = areas[i].union(&areas[j]);
        areas[i] = merged;
        areas.swap_remove(j);
    }
    areas.sort_by(|a, b| a.y.total_cmp(&b.y).then(a.x.total_cmp(&b.x)));
    areas
}

fn abuts(a: &Rect, b: &Rect) -> bool {
    a.y == b.y && a.height == b.height && (a.right() == b.left() || b.right() == a.left())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
