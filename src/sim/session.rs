//! Session: one run of the game, from maze entry to capture or escape.
//!
//! Processing order inside `update(dt)`:
//!   1. Elapsed time
//!   2. Survival gold (per full interval crossed)
//!   3. Loot pickup on the runner's cell
//!   4. Chaser moves (per full move interval crossed)
//!   5. Loot spawns (per full spawn interval crossed)
//!   6. Capture check
//!
//! Later steps observe earlier ones within the same tick. All three
//! timers are accumulators: leftover time carries into the next tick,
//! and a large `dt` catches up several intervals at once.
//!
//! The runner is stepped by the caller (`step_runner`) before `update`.
//! Reaching the exit is the caller's call too: check `runner_at_exit`
//! and end the run with `end_run`.

use std::rc::Rc;

use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::domain::ai::{Hunter, PursuitContext, PursuitStrategy};
use crate::domain::difficulty::Rules;
use crate::domain::entity::{Chaser, Runner};
use crate::domain::error::SimError;
use crate::domain::grid::{manhattan, EntityRef, Grid};
use super::event::SimEvent;
use super::maze::MazeGenerator;
use super::spawn;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    Running,
    Captured,
    Escaped,
    Abandoned,
}

/// End-of-run numbers handed to the front end.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    pub outcome: Outcome,
    pub elapsed: f64,
    pub time_gold: u32,
    pub pickup_gold: u32,
    pub run_gold: u32,
    pub pickup_diamonds: u32,
}

pub struct Session {
    grid: Grid,
    runner: Runner,
    chasers: Vec<Chaser>,
    rules: Rules,
    rng: ChaCha8Rng,

    elapsed: f64,
    outcome: Outcome,

    // ── Economy ──
    time_gold: u32,
    pickup_gold: u32,
    run_gold: u32,
    pickup_diamonds: u32,

    // ── Accumulators ──
    survival_timer: f64,
    chaser_timer: f64,
    spawn_timer: f64,
}

// ══════════════════════════════════════════════════════════════
// Construction
// ══════════════════════════════════════════════════════════════

impl Session {
    /// Bare session over an existing grid: runner on the entrance, no
    /// chasers. Used directly by tests and by `start`.
    pub fn new(mut grid: Grid, rules: Rules, seed: u64) -> Result<Self, SimError> {
        rules.validate()?;
        let (ex, ey) = grid.entrance();
        let runner = Runner::new(&mut grid, ex, ey)?;
        Ok(Session {
            grid,
            runner,
            chasers: Vec::new(),
            rules,
            rng: ChaCha8Rng::seed_from_u64(seed),
            elapsed: 0.0,
            outcome: Outcome::Running,
            time_gold: 0,
            pickup_gold: 0,
            run_gold: 0,
            pickup_diamonds: 0,
            survival_timer: 0.0,
            chaser_timer: 0.0,
            spawn_timer: 0.0,
        })
    }

    /// Full run setup: generate the maze, place the runner on the
    /// entrance and `rules.chaser_count` hunters away from it, all
    /// sharing one strategy.
    pub fn start(
        generator: &MazeGenerator,
        width: usize,
        height: usize,
        rules: Rules,
        seed: u64,
    ) -> Result<Self, SimError> {
        let mut maze_rng = ChaCha8Rng::seed_from_u64(seed);
        let grid = generator.generate(width, height, &mut maze_rng)?;
        let mut session = Session::new(grid, rules, seed.wrapping_add(1))?;

        let hunter: Rc<dyn PursuitStrategy> = Rc::new(Hunter::new(session.rules.detection_radius));
        for _ in 0..session.rules.chaser_count {
            if let Some((x, y)) = session.pick_chaser_spawn() {
                session.add_chaser(x, y, Some(Rc::clone(&hunter)))?;
            }
        }

        info!(
            "session started: {}x{} maze, {} chasers, seed {}",
            width,
            height,
            session.chasers.len(),
            seed
        );
        Ok(session)
    }

    /// Add a chaser at (x, y). `None` strategy leaves it idle.
    pub fn add_chaser(
        &mut self,
        x: usize,
        y: usize,
        strategy: Option<Rc<dyn PursuitStrategy>>,
    ) -> Result<usize, SimError> {
        let id = self.chasers.len();
        let chaser = Chaser::new(&mut self.grid, id, x, y, strategy)?;
        self.chasers.push(chaser);
        Ok(id)
    }

    /// A random walkable cell far (more than half the width) from the
    /// entrance; any walkable non-entrance cell if none is that far.
    fn pick_chaser_spawn(&mut self) -> Option<(usize, usize)> {
        let entrance = self.grid.entrance();
        let min_dist = self.grid.width() / 2;
        let open: Vec<(usize, usize)> = self
            .grid
            .cells()
            .filter(|c| c.walkable && (c.x(), c.y()) != entrance)
            .map(|c| (c.x(), c.y()))
            .collect();
        let far: Vec<(usize, usize)> = open
            .iter()
            .copied()
            .filter(|&p| manhattan(p, entrance) > min_dist)
            .collect();
        let pool = if far.is_empty() { &open } else { &far };
        if pool.is_empty() { return None; }
        Some(pool[self.rng.gen_range(0..pool.len())])
    }
}

// ══════════════════════════════════════════════════════════════
// Tick
// ══════════════════════════════════════════════════════════════

impl Session {
    /// Advance the runner one glide step. No-op once the run has ended.
    pub fn step_runner(&mut self) {
        if !self.is_running() { return; }
        self.runner.step(&mut self.grid);
    }

    pub fn update(&mut self, dt: f64) -> Vec<SimEvent> {
        if !self.is_running() { return vec![]; }

        let mut events = Vec::new();
        self.elapsed += dt;

        self.resolve_survival_gold(dt, &mut events);
        self.resolve_pickup(&mut events);
        self.resolve_chasers(dt);
        self.resolve_spawns(dt, &mut events);
        self.resolve_capture(&mut events);

        events
    }

    fn resolve_survival_gold(&mut self, dt: f64, events: &mut Vec<SimEvent>) {
        self.survival_timer += dt;
        while self.survival_timer >= self.rules.survival_interval {
            self.survival_timer -= self.rules.survival_interval;
            self.time_gold += self.rules.survival_gold;
            self.run_gold += self.rules.survival_gold;
            events.push(SimEvent::SurvivalGold { amount: self.rules.survival_gold });
        }
    }

    fn resolve_pickup(&mut self, events: &mut Vec<SimEvent>) {
        let (x, y) = self.runner.position();
        let cell = self.grid.cell_mut(x, y);

        let gold = cell.take_gold();
        if gold > 0 {
            self.pickup_gold += gold;
            self.run_gold += gold;
            events.push(SimEvent::GoldPicked { x, y, amount: gold });
        }

        if cell.take_diamond() {
            let bonus = self.rules.diamond_bonus;
            self.pickup_diamonds += 1;
            self.pickup_gold += bonus;
            self.run_gold += bonus;
            events.push(SimEvent::DiamondPicked { x, y, bonus });
        }
    }

    fn resolve_chasers(&mut self, dt: f64) {
        self.chaser_timer += dt;
        while self.chaser_timer >= self.rules.chaser_move_interval {
            self.chaser_timer -= self.rules.chaser_move_interval;
            self.move_chasers_once();
        }
    }

    fn move_chasers_once(&mut self) {
        let target = self.runner.position();
        for chaser in self.chasers.iter_mut() {
            if !chaser.is_active() { continue; }
            let strategy = match chaser.strategy() {
                Some(s) => Rc::clone(s),
                None => continue,
            };
            let ctx = PursuitContext { grid: &self.grid, chaser: chaser.position(), target };
            let (dx, dy) = strategy.decide(&ctx, &mut self.rng);
            chaser.move_by(&mut self.grid, dx, dy);
        }
    }

    fn resolve_spawns(&mut self, dt: f64, events: &mut Vec<SimEvent>) {
        self.spawn_timer += dt;
        while self.spawn_timer >= self.rules.spawn_interval {
            self.spawn_timer -= self.rules.spawn_interval;
            if let Some((x, y, kind)) =
                spawn::spawn_random_loot(&mut self.grid, self.rules.diamond_chance, &mut self.rng)
            {
                events.push(SimEvent::LootSpawned { x, y, kind });
            }
        }
    }

    /// First active chaser standing on the runner's cell ends the run.
    fn resolve_capture(&mut self, events: &mut Vec<SimEvent>) {
        let (x, y) = self.runner.position();
        let grid = &self.grid;
        let caught = self.chasers.iter().find_map(|c| {
            let (cx, cy) = c.position();
            let hit = c.is_active() && grid.cell(cx, cy).is_occupied_by(EntityRef::Runner);
            hit.then(|| c.id())
        });
        if let Some(id) = caught {
            self.runner.kill();
            self.outcome = Outcome::Captured;
            events.push(SimEvent::RunnerCaught { chaser: id, x, y });
            info!("runner caught by chaser {id} at ({x}, {y}) after {:.1}s", self.elapsed);
        }
    }

    /// End the run early (escape through the exit, or abandon).
    pub fn end_run(&mut self) {
        if !self.is_running() { return; }
        self.outcome = if self.runner_at_exit() { Outcome::Escaped } else { Outcome::Abandoned };
        debug!("session ended: {:?} after {:.1}s", self.outcome, self.elapsed);
    }
}

// ══════════════════════════════════════════════════════════════
// Read-only accessors
// ══════════════════════════════════════════════════════════════

impl Session {
    pub fn is_running(&self) -> bool { self.outcome == Outcome::Running }
    pub fn outcome(&self) -> Outcome { self.outcome }
    pub fn elapsed(&self) -> f64 { self.elapsed }
    pub fn time_gold(&self) -> u32 { self.time_gold }
    pub fn pickup_gold(&self) -> u32 { self.pickup_gold }
    pub fn run_gold(&self) -> u32 { self.run_gold }
    pub fn pickup_diamonds(&self) -> u32 { self.pickup_diamonds }
    pub fn grid(&self) -> &Grid { &self.grid }
    pub fn runner(&self) -> &Runner { &self.runner }
    pub fn runner_mut(&mut self) -> &mut Runner { &mut self.runner }
    pub fn chasers(&self) -> &[Chaser] { &self.chasers }
    #[allow(dead_code)]
    pub fn rules(&self) -> &Rules { &self.rules }

    pub fn runner_at_exit(&self) -> bool {
        self.runner.position() == self.grid.exit()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            outcome: self.outcome,
            elapsed: self.elapsed,
            time_gold: self.time_gold,
            pickup_gold: self.pickup_gold,
            run_gold: self.run_gold,
            pickup_diamonds: self.pickup_diamonds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::Direction;
    use crate::domain::grid::tests::grid_from;
    use crate::sim::event::LootKind;

    /// Rules where only what a test sets explicitly ever fires.
    fn quiet_rules() -> Rules {
        Rules {
            detection_radius: 20,
            survival_interval: 1000.0,
            survival_gold: 1,
            chaser_move_interval: 1000.0,
            spawn_interval: 1000.0,
            diamond_chance: 0.0,
            diamond_bonus: 5,
            chaser_count: 0,
        }
    }

    fn corridor() -> Grid {
        grid_from(&[
            "#####",
            "     ",
            "#####",
        ])
    }

    #[test]
    fn survival_gold_accumulates_across_ticks() {
        let rules = Rules { survival_interval: 1.0, survival_gold: 1, ..quiet_rules() };
        let mut s = Session::new(corridor(), rules, 1).unwrap();

        s.update(1.0);
        assert_eq!(s.time_gold(), 1);
        s.update(0.5);
        assert_eq!(s.time_gold(), 1);
        s.update(0.5);
        assert_eq!(s.time_gold(), 2);
        assert_eq!(s.run_gold(), 2);
        assert_eq!(s.pickup_gold(), 0);
        assert!((s.elapsed() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn large_dt_catches_up_several_intervals() {
        let rules = Rules { survival_interval: 10.0, survival_gold: 2, ..quiet_rules() };
        let mut s = Session::new(corridor(), rules, 1).unwrap();
        let events = s.update(35.0);
        assert_eq!(s.time_gold(), 6);
        let awards = events.iter().filter(|e| matches!(e, SimEvent::SurvivalGold { .. })).count();
        assert_eq!(awards, 3);
    }

    #[test]
    fn pickup_collects_gold_and_diamond() {
        let mut grid = corridor();
        grid.cell_mut(1, 1).set_gold(3).unwrap();
        grid.cell_mut(1, 1).diamond = true;
        let mut s = Session::new(grid, quiet_rules(), 1).unwrap();

        s.runner_mut().set_desired(Some(Direction::Right));
        s.step_runner();
        s.runner_mut().set_desired(None);
        let events = s.update(0.1);

        assert_eq!(s.pickup_gold(), 3 + 5);
        assert_eq!(s.pickup_diamonds(), 1);
        assert_eq!(s.run_gold(), 8);
        assert!(!s.grid().cell(1, 1).has_loot());
        assert!(events.contains(&SimEvent::GoldPicked { x: 1, y: 1, amount: 3 }));
        assert!(events.contains(&SimEvent::DiamondPicked { x: 1, y: 1, bonus: 5 }));

        // Nothing left to collect on the next tick.
        s.update(0.1);
        assert_eq!(s.pickup_gold(), 8);
        assert_eq!(s.pickup_diamonds(), 1);
    }

    #[test]
    fn idle_chaser_on_runner_cell_captures() {
        let mut s = Session::new(corridor(), quiet_rules(), 1).unwrap();
        let start = s.runner().position();
        s.add_chaser(start.0, start.1, None).unwrap();

        let events = s.update(0.1);
        assert!(!s.is_running());
        assert!(!s.runner().is_alive());
        assert_eq!(s.outcome(), Outcome::Captured);
        assert_eq!(events.last(), Some(&SimEvent::RunnerCaught { chaser: 0, x: 0, y: 1 }));
    }

    #[test]
    fn first_chaser_match_wins() {
        let mut s = Session::new(corridor(), quiet_rules(), 1).unwrap();
        s.add_chaser(3, 1, None).unwrap();
        s.add_chaser(0, 1, None).unwrap();
        s.add_chaser(0, 1, None).unwrap();
        let events = s.update(0.1);
        let caught: Vec<_> = events.iter().filter(|e| matches!(e, SimEvent::RunnerCaught { .. })).collect();
        assert_eq!(caught, vec![&SimEvent::RunnerCaught { chaser: 1, x: 0, y: 1 }]);
    }

    #[test]
    fn hunters_move_once_per_interval() {
        let rules = Rules { chaser_move_interval: 0.5, ..quiet_rules() };
        let mut s = Session::new(corridor(), rules, 1).unwrap();
        let hunter: Rc<dyn PursuitStrategy> = Rc::new(Hunter::new(10));
        s.add_chaser(4, 1, Some(hunter)).unwrap();

        s.update(0.25);
        assert_eq!(s.chasers()[0].position(), (4, 1));
        s.update(0.75);
        assert_eq!(s.chasers()[0].position(), (2, 1));
        assert!(s.is_running());

        // Two more intervals in one tick: lands on the runner.
        s.update(1.0);
        assert_eq!(s.chasers()[0].position(), (0, 1));
        assert_eq!(s.outcome(), Outcome::Captured);
    }

    #[test]
    fn inactive_chaser_neither_moves_nor_captures() {
        let rules = Rules { chaser_move_interval: 0.5, ..quiet_rules() };
        let mut s = Session::new(corridor(), rules, 1).unwrap();
        let hunter: Rc<dyn PursuitStrategy> = Rc::new(Hunter::new(10));
        s.add_chaser(1, 1, Some(hunter)).unwrap();
        s.chasers[0].set_active(false);
        s.update(2.0);
        assert_eq!(s.chasers()[0].position(), (1, 1));
        assert!(s.is_running());
    }

    #[test]
    fn ended_session_ignores_updates() {
        let rules = Rules { survival_interval: 1.0, ..quiet_rules() };
        let mut s = Session::new(corridor(), rules, 1).unwrap();
        s.add_chaser(0, 1, None).unwrap();
        s.update(0.1);
        assert!(!s.is_running());

        let elapsed = s.elapsed();
        assert!(s.update(5.0).is_empty());
        assert_eq!(s.elapsed(), elapsed);
        assert_eq!(s.time_gold(), 0);
    }

    #[test]
    fn reaching_exit_and_ending_counts_as_escape() {
        let mut s = Session::new(corridor(), quiet_rules(), 1).unwrap();
        s.runner_mut().set_desired(Some(Direction::Right));
        for _ in 0..3 {
            s.step_runner();
            s.update(0.1);
            assert!(!s.runner_at_exit());
        }
        s.step_runner();
        assert!(s.runner_at_exit());
        s.end_run();
        assert_eq!(s.outcome(), Outcome::Escaped);
        assert!(!s.is_running());

        let summary = s.summary();
        assert_eq!(summary.outcome, Outcome::Escaped);
        assert!((summary.elapsed - 0.3).abs() < 1e-9);
    }

    #[test]
    fn ending_away_from_exit_is_abandon() {
        let mut s = Session::new(corridor(), quiet_rules(), 1).unwrap();
        s.end_run();
        assert_eq!(s.outcome(), Outcome::Abandoned);
    }

    #[test]
    fn spawn_timer_places_loot() {
        let grid = grid_from(&[
            "#########",
            "#       #",
            "#       #",
            "         ",
            "#       #",
            "#       #",
            "#########",
        ]);
        let rules = Rules { spawn_interval: 1.0, diamond_chance: 0.0, ..quiet_rules() };
        let mut s = Session::new(grid, rules, 5).unwrap();
        let events = s.update(3.0);

        let spawned: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SimEvent::LootSpawned { x, y, kind } => Some((*x, *y, *kind)),
                _ => None,
            })
            .collect();
        assert!(!spawned.is_empty() && spawned.len() <= 3);
        let gold_on_grid: u32 = s.grid().cells().map(|c| c.gold()).sum();
        assert_eq!(gold_on_grid as usize, spawned.len());
        assert!(spawned.iter().all(|&(_, _, k)| k == LootKind::Gold));
    }

    #[test]
    fn invalid_rules_rejected() {
        let rules = Rules { spawn_interval: 0.0, ..quiet_rules() };
        assert!(matches!(Session::new(corridor(), rules, 1), Err(SimError::InvalidRules(_))));
    }

    #[test]
    fn walled_entrance_rejected() {
        let grid = grid_from(&["###", "# #", "###"]);
        assert_eq!(
            Session::new(grid, quiet_rules(), 1).err(),
            Some(SimError::NotWalkable { x: 0, y: 1 })
        );
    }

    #[test]
    fn start_builds_a_playable_run() {
        let rules = Rules { chaser_count: 3, ..Rules::default() };
        let s = Session::start(&MazeGenerator::new(), 21, 11, rules, 77).unwrap();
        assert_eq!(s.runner().position(), s.grid().entrance());
        assert_eq!(s.chasers().len(), 3);
        for c in s.chasers() {
            let (x, y) = c.position();
            assert!(s.grid().is_walkable(x, y));
            assert_ne!((x, y), s.grid().entrance());
            assert!(manhattan((x, y), s.grid().entrance()) > 10);
            assert!(s.grid().cell(x, y).is_occupied_by(EntityRef::Chaser(c.id())));
        }
        assert!(s.is_running());
    }

    #[test]
    fn same_seed_same_run() {
        let run = |seed| {
            let mut s = Session::start(&MazeGenerator::new(), 21, 11, Rules::default(), seed).unwrap();
            for _ in 0..50 {
                s.step_runner();
                s.update(0.25);
            }
            (s.chasers().iter().map(|c| c.position()).collect::<Vec<_>>(), s.summary())
        };
        assert_eq!(run(9), run(9));
    }
}
