//! Maze generation.
//!
//! ## Sources (priority order):
//!   1. A preset picked at random from the loaded preset file
//!   2. Procedural carving (the `RANDOM` marker, or any preset failure)
//!
//! ## Preset file format:
//!   One maze per non-empty line. A line is either `RANDOM` or exactly
//!   `height` rows joined by `|`. Within a row, column index = x.
//!   '#' = wall, anything else = floor. Border cells are always wall.
//!
//! ## Procedural pipeline:
//!   1. Recursive backtracker on a 2-cell lattice (explicit stack)
//!   2. Loop injection: ~width*height/10 random wall openings
//!   3. Wall softening: open walls next to floor, more often to the right
//!   4. Exit approach forced open
//!
//! Whatever the source, the middle row is carved end to end last, so
//! entrance and exit are always connected.

use std::path::Path;

use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::error::SimError;
use crate::domain::grid::Grid;

/// Preset line meaning "generate procedurally".
pub const RANDOM_MARKER: &str = "RANDOM";
pub const ROW_DELIMITER: char = '|';

const LOOP_OPEN_CHANCE: f64 = 0.6;
const SOFTEN_LEFT: f64 = 0.10;
const SOFTEN_RIGHT: f64 = 0.28;

const LATTICE_DIRS: [(i32, i32); 4] = [(0, -2), (2, 0), (0, 2), (-2, 0)];

#[derive(Clone, Debug, Default)]
pub struct MazeGenerator {
    presets: Vec<String>,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

impl MazeGenerator {
    /// Procedural-only generator.
    pub fn new() -> Self {
        MazeGenerator { presets: Vec::new() }
    }

    /// Load presets from text: one template per non-empty line.
    pub fn from_text(text: &str) -> Self {
        let presets = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect();
        MazeGenerator { presets }
    }

    /// Load presets from a file. A missing or unreadable file is not an
    /// error: the generator simply has no presets.
    pub fn from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let gen = Self::from_text(&text);
                debug!("loaded {} maze presets from {}", gen.presets.len(), path.display());
                gen
            }
            Err(e) => {
                warn!("maze presets unavailable ({}): {e}; using procedural mazes", path.display());
                Self::new()
            }
        }
    }

    pub fn preset_count(&self) -> usize {
        self.presets.len()
    }

    /// Build a maze of `width x height` (both at least 3).
    pub fn generate<R: Rng>(&self, width: usize, height: usize, rng: &mut R) -> Result<Grid, SimError> {
        if width < 3 || height < 3 {
            return Err(SimError::InvalidDimensions { width, height });
        }
        let mut grid = Grid::new(width, height)?;

        let from_preset = match self.presets.choose(rng) {
            Some(line) if line.trim() != RANDOM_MARKER => apply_preset(&mut grid, line),
            _ => false,
        };
        if !from_preset {
            carve_procedural(&mut grid, rng);
        }

        carve_middle_row(&mut grid);
        Ok(grid)
    }
}

// ══════════════════════════════════════════════════════════════
// Preset parsing
// ══════════════════════════════════════════════════════════════

/// Lay a preset over `grid`. Returns false (leaving the grid untouched)
/// when the row count doesn't match.
fn apply_preset(grid: &mut Grid, line: &str) -> bool {
    let rows: Vec<&str> = line.split(ROW_DELIMITER).collect();
    if rows.len() != grid.height() {
        debug!(
            "maze preset has {} rows, grid needs {}; falling back to procedural",
            rows.len(),
            grid.height()
        );
        return false;
    }

    let (w, h) = (grid.width(), grid.height());
    for (y, row) in rows.iter().enumerate() {
        let chars: Vec<char> = row.chars().collect();
        for x in 0..w {
            let interior = x > 0 && y > 0 && x + 1 < w && y + 1 < h;
            let walkable = interior && chars.get(x).map_or(false, |&c| c != '#');
            grid.set_walkable(x, y, walkable);
        }
    }
    true
}

// ══════════════════════════════════════════════════════════════
// Procedural carving
// ══════════════════════════════════════════════════════════════

fn carve_procedural<R: Rng>(grid: &mut Grid, rng: &mut R) {
    let (w, h) = (grid.width(), grid.height());
    for y in 0..h {
        for x in 0..w {
            grid.set_walkable(x, y, false);
        }
    }
    let (ex, ey) = grid.entrance();
    let (xx, xy) = grid.exit();
    grid.set_walkable(ex, ey, true);
    grid.set_walkable(xx, xy, true);

    carve_backtracker(grid, (1, h / 2), rng);
    inject_loops(grid, rng);
    soften_walls(grid, rng);

    grid.set_walkable(w - 2, h / 2, true);
}

fn is_interior(grid: &Grid, x: i32, y: i32) -> bool {
    x > 0 && y > 0 && (x as usize) + 1 < grid.width() && (y as usize) + 1 < grid.height()
}

/// Randomized depth-first walk stepping two cells at a time, carving the
/// destination and the wall between. Produces a spanning tree.
fn carve_backtracker<R: Rng>(grid: &mut Grid, start: (usize, usize), rng: &mut R) {
    let w = grid.width();
    let mut visited = vec![false; w * grid.height()];
    let mut stack: Vec<(usize, usize)> = vec![start];

    visited[start.1 * w + start.0] = true;
    grid.set_walkable(start.0, start.1, true);

    while let Some(&(x, y)) = stack.last() {
        let mut dirs = LATTICE_DIRS;
        dirs.shuffle(rng);

        let next = dirs.iter().find_map(|&(dx, dy)| {
            let (nx, ny) = (x as i32 + dx, y as i32 + dy);
            if !is_interior(grid, nx, ny) { return None; }
            let (nx, ny) = (nx as usize, ny as usize);
            if visited[ny * w + nx] { None } else { Some((nx, ny, dx, dy)) }
        });

        match next {
            Some((nx, ny, dx, dy)) => {
                let wall_x = (x as i32 + dx / 2) as usize;
                let wall_y = (y as i32 + dy / 2) as usize;
                grid.set_walkable(wall_x, wall_y, true);
                grid.set_walkable(nx, ny, true);
                visited[ny * w + nx] = true;
                stack.push((nx, ny));
            }
            None => {
                stack.pop();
            }
        }
    }
}

/// Random sampling: interior wall cells touching floor open with a fixed
/// chance, turning the spanning tree into a graph with cycles.
fn inject_loops<R: Rng>(grid: &mut Grid, rng: &mut R) {
    let (w, h) = (grid.width(), grid.height());
    if w < 3 || h < 3 { return; }
    let attempts = w * h / 10;
    for _ in 0..attempts {
        let x = rng.gen_range(1..w - 1);
        let y = rng.gen_range(1..h - 1);
        if grid.is_walkable(x, y) { continue; }
        if grid.walkable_neighbours(x, y) == 0 { continue; }
        if rng.gen_bool(LOOP_OPEN_CHANCE) {
            grid.set_walkable(x, y, true);
        }
    }
}

/// Sweep interior walls; open probability rises linearly from left to
/// right so the exit side is more open.
fn soften_walls<R: Rng>(grid: &mut Grid, rng: &mut R) {
    let (w, h) = (grid.width(), grid.height());
    let span = (w - 1).max(1) as f64;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            if grid.is_walkable(x, y) { continue; }
            if grid.walkable_neighbours(x, y) == 0 { continue; }
            let p = SOFTEN_LEFT + (SOFTEN_RIGHT - SOFTEN_LEFT) * (x as f64 / span);
            if rng.gen_bool(p) {
                grid.set_walkable(x, y, true);
            }
        }
    }
}

/// Carve the entrance row end to end and re-open entrance and exit.
fn carve_middle_row(grid: &mut Grid) {
    let mid = grid.height() / 2;
    for x in 0..grid.width() {
        grid.set_walkable(x, mid, true);
    }
    let (ex, ey) = grid.entrance();
    let (xx, xy) = grid.exit();
    grid.set_walkable(ex, ey, true);
    grid.set_walkable(xx, xy, true);
}
