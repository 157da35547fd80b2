//! Keyboard input tracker.
//!
//! Collects the key presses of one frame and maps them onto runner
//! directions and menu commands. Terminals that only report presses
//! (no Release events) would otherwise turn key auto-repeat into a
//! stream of fresh presses, so a key counts as "fresh" only after it
//! has been quiet for `HOLD_TIMEOUT`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::Direction;

const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

pub struct InputState {
    /// Timestamp of the last Press/Repeat event per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from idle to active during the last drain, in
    /// arrival order.
    fresh_presses: Vec<KeyCode>,
    raw_events: Vec<KeyEvent>,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        let mut events = Vec::new();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                events.push(key);
            }
        }
        self.feed(Instant::now(), events);
    }

    /// Apply one frame's worth of key events observed at `now`.
    fn feed(&mut self, now: Instant, events: Vec<KeyEvent>) {
        self.fresh_presses.clear();
        self.raw_events.clear();

        for key in events {
            if key.kind == KeyEventKind::Release {
                self.last_active.remove(&key.code);
                continue;
            }
            let was_held = self.last_active
                .get(&key.code)
                .is_some_and(|t| now.duration_since(*t) < HOLD_TIMEOUT);
            self.last_active.insert(key.code, now);
            if !was_held {
                self.fresh_presses.push(key.code);
            }
            self.raw_events.push(key);
        }

        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    /// Was this key freshly pressed this frame?
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(k.code, KeyCode::Char('c') | KeyCode::Char('C'))
        })
    }

    /// Latest direction pressed this frame, if any. A later key wins
    /// when several arrive in the same frame.
    pub fn direction(&self) -> Option<Direction> {
        self.fresh_presses.iter().rev().find_map(|c| direction_for(*c))
    }
}

/// Arrow keys and WASD (either case).
pub fn direction_for(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Some(Direction::Up),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Direction::Right),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Some(Direction::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Some(Direction::Left),
        _ => None,
    }
}
