//! Entry point and game loop.

mod config;
mod domain;
mod sim;
mod ui;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::KeyCode;
use log::{error, info};

use config::GameConfig;
use domain::difficulty::Difficulty;
use domain::entity::Direction;
use sim::event::SimEvent;
use sim::maze::MazeGenerator;
use sim::session::{RunSummary, Session};
use ui::input::InputState;
use ui::renderer::{Renderer, Screen};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
/// How many ticks a HUD message stays up.
const MESSAGE_TICKS: u32 = 20;

enum Phase {
    Title,
    Playing,
    Ended(RunSummary),
}

struct App {
    phase: Phase,
    /// The one mutable difficulty setting; sessions get a copy of its rules.
    difficulty: Difficulty,
    session: Option<Session>,
    generator: MazeGenerator,
    message: String,
    message_timer: u32,
    /// Direction pressed since the last tick, applied on the next one.
    pending_dir: Option<Option<Direction>>,
    runs: u64,
    best_gold: u32,
}

fn main() -> Result<()> {
    env_logger::init();

    let config = GameConfig::load();
    let generator = MazeGenerator::from_file(&config.maze_file);
    info!(
        "loaded {} preset mazes from {}",
        generator.preset_count(),
        config.maze_file.display()
    );

    let mut app = App {
        phase: Phase::Title,
        difficulty: config.difficulty,
        session: None,
        generator,
        message: String::new(),
        message_timer: 0,
        pending_dir: None,
        runs: 0,
        best_gold: 0,
    };

    let mut renderer = Renderer::new();
    renderer.init().context("terminal init failed")?;

    let result = game_loop(&mut app, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        error!("terminal cleanup failed: {e}");
    }
    result?;

    println!();
    println!("Thanks for playing Maze Chase!");
    println!("Runs: {}   Best gold: {}", app.runs, app.best_gold);
    Ok(())
}

fn game_loop(app: &mut App, renderer: &mut Renderer, config: &GameConfig) -> Result<()> {
    let mut kb = InputState::new();
    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.tick_rate_ms);

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() {
            break;
        }
        if handle_meta(app, &kb, config)? {
            break;
        }

        if matches!(app.phase, Phase::Playing) {
            if let Some(dir) = kb.direction() {
                app.pending_dir = Some(Some(dir));
            } else if kb.was_pressed(KeyCode::Char(' ')) {
                app.pending_dir = Some(None);
            }
        }

        if last_tick.elapsed() >= tick_rate {
            let dt = last_tick.elapsed().as_secs_f64();
            last_tick = Instant::now();

            if matches!(app.phase, Phase::Playing) {
                tick_session(app, dt);
            }

            if app.message_timer > 0 {
                app.message_timer -= 1;
                if app.message_timer == 0 { app.message.clear(); }
            }
        }

        let screen = match (&app.phase, app.session.as_ref()) {
            (Phase::Playing, Some(session)) => Screen::Playing {
                session,
                difficulty: app.difficulty,
                message: &app.message,
            },
            (Phase::Ended(summary), Some(session)) => Screen::Ended {
                session,
                difficulty: app.difficulty,
                summary,
            },
            _ => Screen::Title {
                difficulty: app.difficulty,
                presets: app.generator.preset_count(),
            },
        };
        renderer.render(&screen)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

/// One simulation tick: input, runner glide, session update, escape check.
fn tick_session(app: &mut App, dt: f64) {
    let Some(session) = app.session.as_mut() else { return };

    if let Some(dir) = app.pending_dir.take() {
        session.runner_mut().set_desired(dir);
    }
    session.step_runner();
    let events = session.update(dt);

    if session.is_running() && session.runner_at_exit() {
        session.end_run();
    }

    for event in &events {
        match event {
            SimEvent::SurvivalGold { amount } => set_message(app, &format!("+{amount} gold for staying alive")),
            SimEvent::DiamondPicked { bonus, .. } => set_message(app, &format!("Diamond! +{bonus} gold")),
            _ => {}
        }
    }

    let Some(session) = app.session.as_ref() else { return };
    if !session.is_running() {
        let summary = session.summary();
        app.best_gold = app.best_gold.max(summary.run_gold);
        info!("run over: {:?}, {} gold", summary.outcome, summary.run_gold);
        app.phase = Phase::Ended(summary);
    }
}

fn set_message(app: &mut App, text: &str) {
    app.message = text.to_string();
    app.message_timer = MESSAGE_TICKS;
}

fn start_run(app: &mut App, config: &GameConfig) -> Result<()> {
    let seed = if config.seed == 0 { rand::random() } else { config.seed };
    let rules = config.rules(app.difficulty).clone();
    let session = Session::start(&app.generator, config.maze_width, config.maze_height, rules, seed)
        .context("could not start a run")?;

    app.session = Some(session);
    app.phase = Phase::Playing;
    app.pending_dir = None;
    app.message.clear();
    app.message_timer = 0;
    app.runs += 1;
    Ok(())
}

// ── Key Constants ──

const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_PREV: &[KeyCode] = &[KeyCode::Up, KeyCode::Left, KeyCode::Char('w'), KeyCode::Char('a')];
const KEYS_NEXT: &[KeyCode] = &[KeyCode::Down, KeyCode::Right, KeyCode::Char('s'), KeyCode::Char('d')];

/// Phase transitions. Returns true when the player asked to quit.
fn handle_meta(app: &mut App, kb: &InputState, config: &GameConfig) -> Result<bool> {
    let confirm = kb.any_pressed(KEYS_CONFIRM);
    let esc = kb.was_pressed(KeyCode::Esc);

    match app.phase {
        // ── Title Screen ──
        Phase::Title => {
            if confirm {
                start_run(app, config)?;
            } else if kb.any_pressed(KEYS_PREV) {
                app.difficulty = cycle(app.difficulty, -1);
            } else if kb.any_pressed(KEYS_NEXT) {
                app.difficulty = cycle(app.difficulty, 1);
            } else if kb.any_pressed(KEYS_QUIT) || esc {
                return Ok(true);
            }
        }

        // ── Playing ──
        Phase::Playing => {
            if esc {
                if let Some(session) = app.session.as_mut() {
                    session.end_run();
                    let summary = session.summary();
                    app.best_gold = app.best_gold.max(summary.run_gold);
                    app.phase = Phase::Ended(summary);
                }
            }
        }

        // ── Run summary ──
        Phase::Ended(_) => {
            if confirm {
                start_run(app, config)?;
            } else if esc {
                app.session = None;
                app.phase = Phase::Title;
            }
        }
    }

    Ok(false)
}

fn cycle(current: Difficulty, step: isize) -> Difficulty {
    let all = Difficulty::ALL;
    let idx = all.iter().position(|d| *d == current).unwrap_or(0) as isize;
    let next = (idx + step).rem_euclid(all.len() as isize) as usize;
    all[next]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_cycle_wraps() {
        assert_eq!(cycle(Difficulty::Easy, -1), Difficulty::Hard);
        assert_eq!(cycle(Difficulty::Hard, 1), Difficulty::Easy);
        assert_eq!(cycle(Difficulty::Normal, 1), Difficulty::Hard);
    }
}
