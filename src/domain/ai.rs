//! Chaser AI: distance-gated wander or BFS pursuit.
//!
//! Two modes, selected each tick by Manhattan distance to the target:
//!   1. **Wander**: target beyond the detection radius. Try the four
//!      axis directions in a randomly rotated order, take the first open one.
//!   2. **Pursue**: BFS over walkable cells toward the target and take
//!      the first step of the path found. An unreachable target falls
//!      back to wander for this tick.
//!
//! Strategies only decide; the session applies the move.

use std::collections::VecDeque;

use rand::{Rng, RngCore};

use super::grid::{manhattan, Grid, DIRS4};

/// What a strategy may look at when deciding a move.
pub struct PursuitContext<'a> {
    pub grid: &'a Grid,
    pub chaser: (usize, usize),
    pub target: (usize, usize),
}

/// A per-tick movement decision. Returns the `(dx, dy)` offset to try;
/// `(0, 0)` means stay put.
pub trait PursuitStrategy {
    fn decide(&self, ctx: &PursuitContext<'_>, rng: &mut dyn RngCore) -> (i32, i32);
}

/// Reference chaser: wander when far, hunt by shortest path when close.
#[derive(Clone, Copy, Debug)]
pub struct Hunter {
    pub detection_radius: usize,
}

impl Hunter {
    pub fn new(detection_radius: usize) -> Self {
        Hunter { detection_radius }
    }
}

impl PursuitStrategy for Hunter {
    fn decide(&self, ctx: &PursuitContext<'_>, rng: &mut dyn RngCore) -> (i32, i32) {
        if ctx.chaser == ctx.target { return (0, 0); }

        if manhattan(ctx.chaser, ctx.target) > self.detection_radius {
            return wander(ctx.grid, ctx.chaser, rng);
        }

        match first_step(ctx.grid, ctx.chaser, ctx.target) {
            Some(step) => step,
            None => wander(ctx.grid, ctx.chaser, rng),
        }
    }
}

// ── Wander ──

pub fn wander(grid: &Grid, from: (usize, usize), rng: &mut dyn RngCore) -> (i32, i32) {
    let start = rng.gen_range(0..DIRS4.len());
    for i in 0..DIRS4.len() {
        let (dx, dy) = DIRS4[(start + i) % DIRS4.len()];
        if grid.is_walkable_i(from.0 as i32 + dx, from.1 as i32 + dy) {
            return (dx, dy);
        }
    }
    (0, 0)
}

// ── Pursue ──

/// BFS from `from` to `to` over walkable cells.
/// Returns the offset of the first step on a shortest path, or None if
/// `to` is unreachable (or equal to `from`).
pub fn first_step(grid: &Grid, from: (usize, usize), to: (usize, usize)) -> Option<(i32, i32)> {
    if from == to || !grid.in_bounds(to.0, to.1) { return None; }

    let width = grid.width();
    let idx = |x: usize, y: usize| y * width + x;

    let mut visited = vec![false; width * grid.height()];
    let mut parent: Vec<Option<(usize, usize)>> = vec![None; width * grid.height()];
    let mut queue: VecDeque<(usize, usize)> = VecDeque::with_capacity(64);

    visited[idx(from.0, from.1)] = true;
    queue.push_back(from);

    let mut found = false;
    while let Some((cx, cy)) = queue.pop_front() {
        if (cx, cy) == to {
            found = true;
            break;
        }
        for &(dx, dy) in &DIRS4 {
            let nx = cx as i32 + dx;
            let ny = cy as i32 + dy;
            if !grid.is_walkable_i(nx, ny) { continue; }
            let (nx, ny) = (nx as usize, ny as usize);
            if visited[idx(nx, ny)] { continue; }
            visited[idx(nx, ny)] = true;
            parent[idx(nx, ny)] = Some((cx, cy));
            queue.push_back((nx, ny));
        }
    }

    if !found { return None; }

    // Walk back until the parent is the start cell.
    let mut cur = to;
    while let Some(p) = parent[idx(cur.0, cur.1)] {
        if p == from {
            return Some((cur.0 as i32 - from.0 as i32, cur.1 as i32 - from.1 as i32));
        }
        cur = p;
    }
    None
}
