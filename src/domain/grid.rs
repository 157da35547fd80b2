//! Grid storage: cells, loot, and who is standing where.
//!
//! Cells carry state as plain fields; the grid itself has no behavior
//! beyond storage and bounds-checked access. Walkability is settled by
//! the maze generator, loot by the session, occupancy by the movers.

use super::error::SimError;

/// Back-reference to an entity standing on a cell. Never owns the entity.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum EntityRef {
    Runner,
    Chaser(usize),
}

#[derive(Clone, Debug)]
pub struct Cell {
    x: usize,
    y: usize,
    pub walkable: bool,
    gold: u32,
    pub diamond: bool,
    occupants: Vec<EntityRef>,
}

impl Cell {
    fn new(x: usize, y: usize) -> Self {
        Cell { x, y, walkable: false, gold: 0, diamond: false, occupants: Vec::new() }
    }

    pub fn x(&self) -> usize { self.x }
    pub fn y(&self) -> usize { self.y }

    pub fn gold(&self) -> u32 {
        self.gold
    }

    /// Assign the gold amount. Negative amounts are rejected.
    #[allow(dead_code)]
    pub fn set_gold(&mut self, amount: i32) -> Result<(), SimError> {
        if amount < 0 {
            return Err(SimError::NegativeGold(amount));
        }
        self.gold = amount as u32;
        Ok(())
    }

    pub fn add_gold(&mut self, amount: u32) {
        self.gold = self.gold.saturating_add(amount);
    }

    /// Remove and return all gold on this cell.
    pub fn take_gold(&mut self) -> u32 {
        std::mem::take(&mut self.gold)
    }

    /// Remove the diamond, returning whether there was one.
    pub fn take_diamond(&mut self) -> bool {
        std::mem::take(&mut self.diamond)
    }

    pub fn has_loot(&self) -> bool {
        self.gold > 0 || self.diamond
    }

    pub fn occupants(&self) -> &[EntityRef] {
        &self.occupants
    }

    pub fn is_occupied_by(&self, who: EntityRef) -> bool {
        self.occupants.contains(&who)
    }

    pub(crate) fn add_occupant(&mut self, who: EntityRef) {
        if !self.occupants.contains(&who) {
            self.occupants.push(who);
        }
    }

    pub(crate) fn remove_occupant(&mut self, who: EntityRef) {
        self.occupants.retain(|&e| e != who);
    }
}

pub struct Grid {
    width: usize,
    height: usize,
    /// `cells[y][x]`
    cells: Vec<Vec<Cell>>,
    entrance: (usize, usize),
    exit: (usize, usize),
}

impl Grid {
    /// A grid of walls. Entrance and exit default to the middle row's
    /// left and right border cells.
    pub fn new(width: usize, height: usize) -> Result<Self, SimError> {
        if width == 0 || height == 0 {
            return Err(SimError::InvalidDimensions { width, height });
        }
        let cells = (0..height)
            .map(|y| (0..width).map(|x| Cell::new(x, y)).collect())
            .collect();
        Ok(Grid {
            width,
            height,
            cells,
            entrance: (0, height / 2),
            exit: (width - 1, height / 2),
        })
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }

    pub fn entrance(&self) -> (usize, usize) { self.entrance }
    pub fn exit(&self) -> (usize, usize) { self.exit }

    #[allow(dead_code)]
    pub fn set_entrance(&mut self, x: usize, y: usize) -> Result<(), SimError> {
        self.check_bounds(x, y)?;
        self.entrance = (x, y);
        Ok(())
    }

    #[allow(dead_code)]
    pub fn set_exit(&mut self, x: usize, y: usize) -> Result<(), SimError> {
        self.check_bounds(x, y)?;
        self.exit = (x, y);
        Ok(())
    }

    #[inline]
    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height
    }

    /// Signed variant for neighbour arithmetic.
    #[inline]
    pub fn in_bounds_i(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && self.in_bounds(x as usize, y as usize)
    }

    /// Cell at (x, y).
    ///
    /// # Panics
    /// Out-of-range coordinates are a caller bug; check `in_bounds` first.
    pub fn cell(&self, x: usize, y: usize) -> &Cell {
        assert!(self.in_bounds(x, y), "cell ({x}, {y}) outside {}x{} grid", self.width, self.height);
        &self.cells[y][x]
    }

    /// Mutable cell at (x, y). Panics out of range, like `cell`.
    pub fn cell_mut(&mut self, x: usize, y: usize) -> &mut Cell {
        assert!(self.in_bounds(x, y), "cell ({x}, {y}) outside {}x{} grid", self.width, self.height);
        &mut self.cells[y][x]
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&Cell> {
        self.cells.get(y).and_then(|row| row.get(x))
    }

    /// Walkable and in bounds. Out of bounds counts as wall.
    #[inline]
    pub fn is_walkable(&self, x: usize, y: usize) -> bool {
        self.get(x, y).map_or(false, |c| c.walkable)
    }

    #[inline]
    pub fn is_walkable_i(&self, x: i32, y: i32) -> bool {
        self.in_bounds_i(x, y) && self.is_walkable(x as usize, y as usize)
    }

    pub fn set_walkable(&mut self, x: usize, y: usize, walkable: bool) {
        self.cell_mut(x, y).walkable = walkable;
    }

    /// Is (x, y) on the outer border?
    pub fn is_border(&self, x: usize, y: usize) -> bool {
        x == 0 || y == 0 || x + 1 == self.width || y + 1 == self.height
    }

    /// Number of walkable 4-neighbours of (x, y).
    pub fn walkable_neighbours(&self, x: usize, y: usize) -> usize {
        DIRS4
            .iter()
            .filter(|&&(dx, dy)| self.is_walkable_i(x as i32 + dx, y as i32 + dy))
            .count()
    }

    /// Drop every occupancy entry.
    #[allow(dead_code)]
    pub fn clear_entities(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            cell.occupants.clear();
        }
    }

    /// Remove all loot (gold and diamonds).
    #[allow(dead_code)]
    pub fn clear_gold(&mut self) {
        for cell in self.cells.iter_mut().flatten() {
            cell.gold = 0;
            cell.diamond = false;
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().flatten()
    }

    fn check_bounds(&self, x: usize, y: usize) -> Result<(), SimError> {
        if self.in_bounds(x, y) { Ok(()) } else { Err(SimError::OutOfBounds { x, y }) }
    }
}

/// Canonical neighbour order: up, right, down, left.
pub const DIRS4: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

pub fn manhattan(a: (usize, usize), b: (usize, usize)) -> usize {
    a.0.abs_diff(b.0) + a.1.abs_diff(b.1)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a grid from a diagram.
    /// Legend: '#'=wall  '$'=one gold  '*'=diamond  anything else=floor.
    /// Entrance/exit stay at their defaults.
    pub(crate) fn grid_from(rows: &[&str]) -> Grid {
        let height = rows.len();
        let width = rows[0].len();
        let mut grid = Grid::new(width, height).unwrap();
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let cell = grid.cell_mut(x, y);
                cell.walkable = ch != '#';
                match ch {
                    '$' => cell.add_gold(1),
                    '*' => cell.diamond = true,
                    _ => {}
                }
            }
        }
        grid
    }

    #[test]
    fn zero_dimensions_rejected() {
        assert_eq!(
            Grid::new(0, 5).err(),
            Some(SimError::InvalidDimensions { width: 0, height: 5 })
        );
        assert!(Grid::new(4, 0).is_err());
        assert!(Grid::new(1, 1).is_ok());
    }

    #[test]
    fn new_grid_is_all_wall_with_middle_row_doors() {
        let g = Grid::new(7, 5).unwrap();
        assert!(g.cells().all(|c| !c.walkable && c.gold() == 0 && !c.diamond));
        assert_eq!(g.entrance(), (0, 2));
        assert_eq!(g.exit(), (6, 2));
    }

    #[test]
    fn negative_gold_rejected() {
        let mut g = Grid::new(3, 3).unwrap();
        assert_eq!(g.cell_mut(1, 1).set_gold(-1), Err(SimError::NegativeGold(-1)));
        assert_eq!(g.cell(1, 1).gold(), 0);
        g.cell_mut(1, 1).set_gold(4).unwrap();
        assert_eq!(g.cell(1, 1).gold(), 4);
        assert_eq!(g.cell_mut(1, 1).take_gold(), 4);
        assert_eq!(g.cell(1, 1).gold(), 0);
    }

    #[test]
    #[should_panic]
    fn cell_out_of_range_panics() {
        let g = Grid::new(3, 3).unwrap();
        let _ = g.cell(3, 0);
    }

    #[test]
    fn out_of_bounds_is_not_walkable() {
        let g = grid_from(&["   ", "   "]);
        assert!(g.is_walkable(2, 1));
        assert!(!g.is_walkable(3, 1));
        assert!(!g.is_walkable_i(-1, 0));
        assert!(g.get(0, 2).is_none());
    }

    #[test]
    fn occupancy_is_a_set() {
        let mut g = Grid::new(2, 2).unwrap();
        g.cell_mut(0, 0).add_occupant(EntityRef::Chaser(1));
        g.cell_mut(0, 0).add_occupant(EntityRef::Chaser(1));
        g.cell_mut(0, 0).add_occupant(EntityRef::Runner);
        assert_eq!(g.cell(0, 0).occupants().len(), 2);
        g.cell_mut(0, 0).remove_occupant(EntityRef::Chaser(1));
        assert_eq!(g.cell(0, 0).occupants(), &[EntityRef::Runner]);
        g.clear_entities();
        assert!(g.cell(0, 0).occupants().is_empty());
    }

    #[test]
    fn clear_gold_removes_all_loot() {
        let mut g = grid_from(&["$*$", "  $"]);
        assert_eq!(g.cells().filter(|c| c.has_loot()).count(), 4);
        g.clear_gold();
        assert!(g.cells().all(|c| !c.has_loot()));
    }

    #[test]
    fn set_exit_checks_bounds() {
        let mut g = Grid::new(4, 4).unwrap();
        assert_eq!(g.set_exit(4, 1), Err(SimError::OutOfBounds { x: 4, y: 1 }));
        g.set_exit(3, 1).unwrap();
        assert_eq!(g.exit(), (3, 1));
    }

    #[test]
    fn manhattan_distance() {
        assert_eq!(manhattan((1, 2), (4, 0)), 5);
        assert_eq!(manhattan((3, 3), (3, 3)), 0);
    }
}
