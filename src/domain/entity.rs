//! Movers: the Runner (player) and the Chasers.
//!
//! Both keep their own position and mirror it into the grid's occupancy
//! lists on every successful move. Collision detection reads occupancy,
//! so the two must never drift apart.

use std::fmt;
use std::rc::Rc;

use super::ai::PursuitStrategy;
use super::error::SimError;
use super::grid::{EntityRef, Grid};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    Up,
    Right,
    Down,
    Left,
}

impl Direction {
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Right => (1, 0),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
        }
    }
}

/// Shared move primitive: bounds + walkable check, then occupancy swap.
/// Returns the new position on success.
fn try_relocate(
    grid: &mut Grid,
    who: EntityRef,
    x: usize,
    y: usize,
    dx: i32,
    dy: i32,
) -> Option<(usize, usize)> {
    if dx == 0 && dy == 0 { return None; }
    let nx = x as i32 + dx;
    let ny = y as i32 + dy;
    if !grid.is_walkable_i(nx, ny) { return None; }
    let (nx, ny) = (nx as usize, ny as usize);
    grid.cell_mut(x, y).remove_occupant(who);
    grid.cell_mut(nx, ny).add_occupant(who);
    Some((nx, ny))
}

fn check_start(grid: &Grid, x: usize, y: usize) -> Result<(), SimError> {
    if !grid.in_bounds(x, y) {
        return Err(SimError::OutOfBounds { x, y });
    }
    if !grid.is_walkable(x, y) {
        return Err(SimError::NotWalkable { x, y });
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Runner
// ══════════════════════════════════════════════════════════════

/// Player-controlled mover using the glide model: the committed
/// direction keeps it moving until a wall stops it, and a turn is only
/// taken if the cell in the new direction is open at that instant.
#[derive(Clone, Debug)]
pub struct Runner {
    x: usize,
    y: usize,
    alive: bool,
    committed: Option<Direction>,
    desired: Option<Direction>,
}

impl Runner {
    /// Place a runner on `(x, y)` and register it on that cell.
    pub fn new(grid: &mut Grid, x: usize, y: usize) -> Result<Self, SimError> {
        check_start(grid, x, y)?;
        grid.cell_mut(x, y).add_occupant(EntityRef::Runner);
        Ok(Runner { x, y, alive: true, committed: None, desired: None })
    }

    pub fn position(&self) -> (usize, usize) { (self.x, self.y) }
    pub fn is_alive(&self) -> bool { self.alive }
    #[allow(dead_code)]
    pub fn committed(&self) -> Option<Direction> { self.committed }
    #[allow(dead_code)]
    pub fn desired(&self) -> Option<Direction> { self.desired }

    /// Input hook. `None` asks the runner to stop.
    pub fn set_desired(&mut self, dir: Option<Direction>) {
        self.desired = dir;
    }

    pub fn kill(&mut self) {
        self.alive = false;
    }

    /// One glide tick.
    pub fn step(&mut self, grid: &mut Grid) {
        if !self.alive { return; }

        if self.desired != self.committed {
            let open = match self.desired {
                None => true,
                Some(dir) => {
                    let (dx, dy) = dir.delta();
                    grid.is_walkable_i(self.x as i32 + dx, self.y as i32 + dy)
                }
            };
            if open {
                self.committed = self.desired;
            }
        }

        if let Some(dir) = self.committed {
            let (dx, dy) = dir.delta();
            if !self.move_by(grid, dx, dy) {
                // Coast to a stop; the blocked move is not queued.
                self.committed = None;
            }
        }
    }

    /// Raw one-cell move. Returns false (and stays put) when blocked.
    pub fn move_by(&mut self, grid: &mut Grid, dx: i32, dy: i32) -> bool {
        if !self.alive { return false; }
        match try_relocate(grid, EntityRef::Runner, self.x, self.y, dx, dy) {
            Some((nx, ny)) => {
                self.x = nx;
                self.y = ny;
                true
            }
            None => false,
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Chaser
// ══════════════════════════════════════════════════════════════

/// AI-driven mover. The strategy is shared between chasers; `None`
/// leaves the chaser idle. Chasers never block one another.
#[derive(Clone)]
pub struct Chaser {
    id: usize,
    x: usize,
    y: usize,
    active: bool,
    strategy: Option<Rc<dyn PursuitStrategy>>,
}

impl fmt::Debug for Chaser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chaser")
            .field("id", &self.id)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("active", &self.active)
            .field("has_strategy", &self.strategy.is_some())
            .finish()
    }
}

impl Chaser {
    pub fn new(
        grid: &mut Grid,
        id: usize,
        x: usize,
        y: usize,
        strategy: Option<Rc<dyn PursuitStrategy>>,
    ) -> Result<Self, SimError> {
        check_start(grid, x, y)?;
        grid.cell_mut(x, y).add_occupant(EntityRef::Chaser(id));
        Ok(Chaser { id, x, y, active: true, strategy })
    }

    pub fn id(&self) -> usize { self.id }
    pub fn position(&self) -> (usize, usize) { (self.x, self.y) }
    pub fn is_active(&self) -> bool { self.active }

    #[allow(dead_code)]
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn strategy(&self) -> Option<&Rc<dyn PursuitStrategy>> {
        self.strategy.as_ref()
    }

    pub fn move_by(&mut self, grid: &mut Grid, dx: i32, dy: i32) -> bool {
        if !self.active { return false; }
        match try_relocate(grid, EntityRef::Chaser(self.id), self.x, self.y, dx, dy) {
            Some((nx, ny)) => {
                self.x = nx;
                self.y = ny;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::grid::tests::grid_from;

    #[test]
    fn runner_start_must_be_valid() {
        let mut g = grid_from(&[
            "###",
            "# #",
            "###",
        ]);
        assert_eq!(Runner::new(&mut g, 5, 1).err(), Some(SimError::OutOfBounds { x: 5, y: 1 }));
        assert_eq!(Runner::new(&mut g, 0, 0).err(), Some(SimError::NotWalkable { x: 0, y: 0 }));
        let r = Runner::new(&mut g, 1, 1).unwrap();
        assert_eq!(r.position(), (1, 1));
        assert!(g.cell(1, 1).is_occupied_by(EntityRef::Runner));
    }

    #[test]
    fn move_into_wall_or_outside_is_refused() {
        let mut g = grid_from(&[
            "  #",
            "   ",
        ]);
        let mut r = Runner::new(&mut g, 1, 0).unwrap();
        assert!(!r.move_by(&mut g, 1, 0));   // wall
        assert!(!r.move_by(&mut g, 0, -1));  // off the top
        assert_eq!(r.position(), (1, 0));
        assert!(r.move_by(&mut g, 0, 1));
        assert_eq!(r.position(), (1, 1));
        assert!(!g.cell(1, 0).is_occupied_by(EntityRef::Runner));
        assert!(g.cell(1, 1).is_occupied_by(EntityRef::Runner));
    }

    #[test]
    fn zero_delta_and_dead_moves_are_noops() {
        let mut g = grid_from(&["   "]);
        let mut r = Runner::new(&mut g, 0, 0).unwrap();
        assert!(!r.move_by(&mut g, 0, 0));
        r.kill();
        assert!(!r.move_by(&mut g, 1, 0));
        r.set_desired(Some(Direction::Right));
        r.step(&mut g);
        assert_eq!(r.position(), (0, 0));
    }

    #[test]
    fn glide_continues_until_wall() {
        let mut g = grid_from(&["    #"]);
        let mut r = Runner::new(&mut g, 0, 0).unwrap();
        r.set_desired(Some(Direction::Right));
        for _ in 0..3 { r.step(&mut g); }
        assert_eq!(r.position(), (3, 0));
        assert_eq!(r.committed(), Some(Direction::Right));
        // Blocked: committed direction clears, position unchanged.
        r.step(&mut g);
        assert_eq!(r.position(), (3, 0));
        assert_eq!(r.committed(), None);
    }

    #[test]
    fn turn_only_taken_when_open() {
        let mut g = grid_from(&[
            "#### ",
            "     ",
        ]);
        let mut r = Runner::new(&mut g, 0, 1).unwrap();
        r.set_desired(Some(Direction::Right));
        r.step(&mut g);
        assert_eq!(r.position(), (1, 1));

        // Up is walled until x == 4; the runner keeps gliding right.
        r.set_desired(Some(Direction::Up));
        r.step(&mut g);
        r.step(&mut g);
        assert_eq!(r.position(), (3, 1));
        assert_eq!(r.committed(), Some(Direction::Right));
        r.step(&mut g);
        assert_eq!(r.position(), (4, 1));
        r.step(&mut g);
        assert_eq!(r.position(), (4, 0));
        assert_eq!(r.committed(), Some(Direction::Up));
    }

    #[test]
    fn desired_stop_halts_immediately() {
        let mut g = grid_from(&["     "]);
        let mut r = Runner::new(&mut g, 0, 0).unwrap();
        r.set_desired(Some(Direction::Right));
        r.step(&mut g);
        r.set_desired(None);
        r.step(&mut g);
        assert_eq!(r.position(), (1, 0));
        assert_eq!(r.committed(), None);
    }

    #[test]
    fn chasers_share_cells() {
        let mut g = grid_from(&["   "]);
        let mut a = Chaser::new(&mut g, 0, 0, 0, None).unwrap();
        let b = Chaser::new(&mut g, 1, 1, 0, None).unwrap();
        assert!(a.move_by(&mut g, 1, 0));
        assert_eq!(a.position(), b.position());
        assert_eq!(g.cell(1, 0).occupants().len(), 2);
    }

    #[test]
    fn inactive_chaser_does_not_move() {
        let mut g = grid_from(&["   "]);
        let mut c = Chaser::new(&mut g, 7, 0, 0, None).unwrap();
        c.set_active(false);
        assert!(!c.move_by(&mut g, 1, 0));
        assert_eq!(c.position(), (0, 0));
        assert!(g.cell(0, 0).is_occupied_by(EntityRef::Chaser(7)));
    }

    #[test]
    fn chaser_start_out_of_bounds_fails() {
        let mut g = grid_from(&["   "]);
        assert!(Chaser::new(&mut g, 0, 0, 3, None).is_err());
    }
}
