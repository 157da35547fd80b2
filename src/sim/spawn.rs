//! Loot spawner: bounded rejection sampling biased toward the outer ring.

use rand::{Rng, RngCore};

use crate::domain::grid::Grid;
use super::event::LootKind;

pub const SPAWN_ATTEMPTS: usize = 100;
/// Outer ring margins: columns from the left/right edge, rows from top/bottom.
pub const RING_COLUMNS: usize = 4;
pub const RING_ROWS: usize = 3;
/// Chance that an inner (non-ring) candidate is thrown away.
const INNER_REJECT_CHANCE: f64 = 0.6;

pub fn is_outer_ring(grid: &Grid, x: usize, y: usize) -> bool {
    x < RING_COLUMNS
        || x + RING_COLUMNS >= grid.width()
        || y < RING_ROWS
        || y + RING_ROWS >= grid.height()
}

/// Try to drop one piece of loot. Returns where it landed and what it
/// was, or None when every attempt was rejected.
pub fn spawn_random_loot(
    grid: &mut Grid,
    diamond_chance: f64,
    rng: &mut dyn RngCore,
) -> Option<(usize, usize, LootKind)> {
    let (w, h) = (grid.width(), grid.height());
    if w < 3 || h < 3 { return None; }

    for _ in 0..SPAWN_ATTEMPTS {
        let x = rng.gen_range(1..w - 1);
        let y = rng.gen_range(1..h - 1);

        if grid.is_border(x, y) { continue; }
        if (x, y) == grid.entrance() || (x, y) == grid.exit() { continue; }
        let cell = grid.cell(x, y);
        if !cell.walkable || cell.has_loot() { continue; }

        if !is_outer_ring(grid, x, y) && rng.gen_bool(INNER_REJECT_CHANCE) {
            continue;
        }

        let cell = grid.cell_mut(x, y);
        let kind = if rng.gen_bool(diamond_chance) {
            cell.diamond = true;
            LootKind::Diamond
        } else {
            cell.add_gold(1);
            LootKind::Gold
        };
        return Some((x, y, kind));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::tests::grid_from;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn single_candidate_or_nothing() {
        let rows = [
            "###########",
            "###########",
            "###########",
            "#####.#####",
            "###########",
            "###########",
            "###########",
        ];
        for seed in 0..50 {
            let mut g = grid_from(&rows);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            match spawn_random_loot(&mut g, 0.0, &mut rng) {
                Some((x, y, kind)) => {
                    assert_eq!((x, y), (5, 3));
                    assert_eq!(kind, LootKind::Gold);
                    assert_eq!(g.cell(5, 3).gold(), 1);
                }
                None => assert!(g.cells().all(|c| !c.has_loot())),
            }
        }
    }

    #[test]
    fn fully_walled_grid_spawns_nothing() {
        let mut g = grid_from(&["#####", "#####", "#####"]);
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(spawn_random_loot(&mut g, 0.5, &mut rng), None);
    }

    #[test]
    fn never_on_entrance_exit_or_existing_loot() {
        // Only entrance, exit and a gold cell are open.
        let mut g = grid_from(&[
            "#####",
            "##$##",
            "     ",
            "#####",
            "#####",
        ]);
        for x in 1..4 { g.set_walkable(x, 2, false); }
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        assert_eq!(spawn_random_loot(&mut g, 0.0, &mut rng), None);
        assert_eq!(g.cell(2, 1).gold(), 1);
    }

    #[test]
    fn certain_diamond_chance_places_diamond() {
        let mut g = grid_from(&[
            "#####",
            "#   #",
            "#   #",
            "#   #",
            "#####",
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let (x, y, kind) = spawn_random_loot(&mut g, 1.0, &mut rng).expect("open ring cells");
        assert_eq!(kind, LootKind::Diamond);
        assert!(g.cell(x, y).diamond);
        assert_eq!(g.cell(x, y).gold(), 0);
    }

    #[test]
    fn spawns_favour_the_outer_ring() {
        // 30x20 open interior: ring cells are a minority of candidates
        // but should win most placements.
        let mut rows = vec!["#".repeat(30)];
        for _ in 0..18 {
            rows.push(format!("#{}#", " ".repeat(28)));
        }
        rows.push("#".repeat(30));
        let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
        let mut g = grid_from(&rows);
        let mut rng = ChaCha8Rng::seed_from_u64(99);

        let (mut ring, mut inner) = (0, 0);
        for _ in 0..300 {
            if let Some((x, y, _)) = spawn_random_loot(&mut g, 0.0, &mut rng) {
                if is_outer_ring(&g, x, y) { ring += 1 } else { inner += 1 }
                g.clear_gold();
            }
        }
        let ring_cells = g.cells().filter(|c| c.walkable && is_outer_ring(&g, c.x(), c.y())).count();
        let inner_cells = g.cells().filter(|c| c.walkable && !is_outer_ring(&g, c.x(), c.y())).count();
        assert!(ring_cells < inner_cells);
        assert!(ring > inner, "ring {ring} inner {inner}");
    }
}
