//! Presentation layer: double-buffered, diff-based terminal renderer.
//!
//! Each frame is composed into `front`, compared against `back` (the
//! previous frame), and only changed cells are emitted. All commands are
//! batched with `queue!` and flushed once, then the buffers swap.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::difficulty::Difficulty;
use crate::domain::grid::{EntityRef, Grid};
use crate::sim::session::{Outcome, RunSummary, Session};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    /// Every cell gets this explicit background so cleared areas and
    /// drawn areas match on terminals with a different default.
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Never equal to a real cell, so everything is repainted.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }
}

// ── What to draw ──

/// One frame's worth of state, borrowed from the game loop.
pub enum Screen<'a> {
    Title { difficulty: Difficulty, presets: usize },
    Playing { session: &'a Session, difficulty: Difficulty, message: &'a str },
    Ended { session: &'a Session, difficulty: Difficulty, summary: &'a RunSummary },
}

impl Screen<'_> {
    fn kind(&self) -> u8 {
        match self {
            Screen::Title { .. } => 0,
            Screen::Playing { .. } => 1,
            Screen::Ended { .. } => 2,
        }
    }
}

// ── Palette ──

const WALL: Color = Color::Rgb { r: 70, g: 90, b: 160 };
const FLOOR: Color = Color::Rgb { r: 30, g: 30, b: 45 };
const GOLD: Color = Color::Rgb { r: 255, g: 200, b: 50 };
const DIAMOND: Color = Color::Rgb { r: 120, g: 230, b: 255 };
const RUNNER: Color = Color::Rgb { r: 80, g: 255, b: 80 };
const CHASER: Color = Color::Rgb { r: 255, g: 70, b: 70 };
const DOOR: Color = Color::Rgb { r: 200, g: 160, b: 255 };

// ── Renderer ──

/// Each maze cell is two terminal columns wide so the maze looks square.
const CELL_W: usize = 2;
const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_screen: Option<u8>,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_screen: None,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        self.fit_terminal()?;
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    pub fn render(&mut self, screen: &Screen<'_>) -> io::Result<()> {
        self.fit_terminal()?;

        if self.last_screen != Some(screen.kind()) {
            self.invalidate()?;
            self.last_screen = Some(screen.kind());
        }

        self.front.clear();
        match screen {
            Screen::Title { difficulty, presets } => self.compose_title(*difficulty, *presets),
            Screen::Playing { session, difficulty, message } => {
                self.compose_game(session, *difficulty, message);
            }
            Screen::Ended { session, difficulty, summary } => {
                self.compose_game(session, *difficulty, "");
                self.compose_summary(summary);
            }
        }

        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    /// Track terminal resizes; a resize forces a full repaint.
    fn fit_terminal(&mut self) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize != self.term_w || th as usize != self.term_h {
            self.term_w = tw as usize;
            self.term_h = th as usize;
            self.front.resize(self.term_w, self.term_h);
            self.back.resize(self.term_w, self.term_h);
            self.invalidate()?;
        }
        Ok(())
    }

    fn invalidate(&mut self) -> io::Result<()> {
        self.back.cells.fill(Cell::INVALID);
        queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) { continue; }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose_game(&mut self, s: &Session, difficulty: Difficulty, message: &str) {
        let hunters = s.chasers().iter().filter(|c| c.is_active()).count();
        let status = match s.outcome() {
            Outcome::Running if s.runner().is_alive() => "",
            Outcome::Escaped => "ESCAPED",
            Outcome::Abandoned => "GAVE UP",
            _ => "CAUGHT",
        };
        let hud = format!(
            " {:<6}  Time {:>6.1}s  Gold {:<4} (time {} / loot {})  Diamonds {}  Hunters {}  {} ",
            difficulty.name(),
            s.elapsed(),
            s.run_gold(),
            s.time_gold(),
            s.pickup_gold(),
            s.pickup_diamonds(),
            hunters,
            status,
        );
        self.front.put_str(0, HUD_ROW, &hud, Color::White, Color::Reset);

        let grid = s.grid();
        let view_w = (self.front.width / CELL_W).min(grid.width());
        let view_h = self.front.height.saturating_sub(MAP_ROW + 2).min(grid.height());
        for gy in 0..view_h {
            for gx in 0..view_w {
                let [left, right] = glyph(grid, gx, gy);
                self.front.set(gx * CELL_W, MAP_ROW + gy, left);
                self.front.set(gx * CELL_W + 1, MAP_ROW + gy, right);
            }
        }

        let foot = MAP_ROW + view_h + 1;
        if !message.is_empty() {
            self.front.put_str(1, foot - 1, message, GOLD, Color::Reset);
        }
        self.front.put_str(
            1,
            foot,
            "Arrows/WASD move   SPACE stop   ESC give up",
            Color::DarkGrey,
            Color::Reset,
        );
    }

    fn compose_title(&mut self, difficulty: Difficulty, presets: usize) {
        let title = [
            r" __  __                  ___ _                 ",
            r"|  \/  |__ _ _____ ___  / __| |_  __ _ ___ ___ ",
            r"| |\/| / _` |_ / -_)___| (__| ' \/ _` (_-</ -_)",
            r"|_|  |_\__,_/__\___|    \___|_||_\__,_/__/\___|",
        ];
        for (i, line) in title.iter().enumerate() {
            self.front.put_str(2, 1 + i, line, GOLD, Color::Reset);
        }

        self.front.put_str(4, 7, "Grab the gold, dodge the hunters, reach the exit.", RUNNER, Color::Reset);

        self.front.put_str(4, 9, "Difficulty:", Color::White, Color::Reset);
        for (i, d) in Difficulty::ALL.iter().enumerate() {
            let (mark, fg) = if *d == difficulty {
                ('>', RUNNER)
            } else {
                (' ', Color::DarkGrey)
            };
            let line = format!("{mark} {}", d.name());
            self.front.put_str(6, 10 + i, &line, fg, Color::Reset);
        }

        let maze_info = match presets {
            0 => "Mazes: procedural".to_string(),
            n => format!("Mazes: {n} presets + procedural fallback"),
        };
        self.front.put_str(4, 14, &maze_info, Color::DarkGrey, Color::Reset);

        let help = [
            "ENTER  Start run",
            "UP/DN  Choose difficulty",
            "Q      Quit",
        ];
        for (i, line) in help.iter().enumerate() {
            self.front.put_str(4, 16 + i, line, Color::White, Color::Reset);
        }

        let legend = [
            ("@", RUNNER, "you"),
            ("M", CHASER, "hunter"),
            ("$", GOLD, "gold"),
            ("*", DIAMOND, "diamond"),
            ("]", DOOR, "exit"),
        ];
        let mut x = 4;
        for (sym, fg, label) in legend {
            self.front.put_str(x, 20, sym, fg, Color::Reset);
            self.front.put_str(x + 2, 20, label, Color::DarkGrey, Color::Reset);
            x += label.len() + 5;
        }
    }

    fn compose_summary(&mut self, summary: &RunSummary) {
        let (headline, fg) = match summary.outcome {
            Outcome::Escaped => ("ESCAPED!", RUNNER),
            Outcome::Captured => ("CAUGHT!", CHASER),
            Outcome::Abandoned | Outcome::Running => ("RUN ABANDONED", Color::White),
        };
        let lines = [
            format!("  {headline}"),
            String::new(),
            format!("  Survived     {:>7.1}s", summary.elapsed),
            format!("  Time gold    {:>7}", summary.time_gold),
            format!("  Loot gold    {:>7}", summary.pickup_gold),
            format!("  Diamonds     {:>7}", summary.pickup_diamonds),
            format!("  Total gold   {:>7}", summary.run_gold),
            String::new(),
            "  ENTER again   ESC title".to_string(),
        ];

        let box_w = 32;
        let box_x = 4;
        let box_y = MAP_ROW + 2;
        let bg = Color::Rgb { r: 40, g: 40, b: 40 };
        for (i, line) in lines.iter().enumerate() {
            for x in box_x..box_x + box_w {
                self.front.set(x, box_y + i, Cell::new(' ', Color::White, bg));
            }
            let color = if i == 0 { fg } else { Color::White };
            self.front.put_str(box_x, box_y + i, line, color, bg);
        }
    }
}

/// Two terminal cells for one maze cell. Entities draw over loot, loot
/// over the floor.
fn glyph(grid: &Grid, x: usize, y: usize) -> [Cell; 2] {
    let pair = |l: char, r: char, fg: Color, bg: Color| [Cell::new(l, fg, bg), Cell::new(r, fg, bg)];
    let cell = grid.cell(x, y);

    if !cell.walkable {
        return pair(' ', ' ', WALL, WALL);
    }
    let occupants = cell.occupants();
    if occupants.iter().any(|o| matches!(o, EntityRef::Chaser(_))) {
        let fg = if cell.is_occupied_by(EntityRef::Runner) { GOLD } else { CHASER };
        return pair('M', ' ', fg, FLOOR);
    }
    if cell.is_occupied_by(EntityRef::Runner) {
        return pair('@', ' ', RUNNER, FLOOR);
    }
    if cell.diamond {
        return pair('*', ' ', DIAMOND, FLOOR);
    }
    if cell.gold() > 0 {
        return pair('$', ' ', GOLD, FLOOR);
    }
    if (x, y) == grid.exit() {
        return pair('[', ']', DOOR, FLOOR);
    }
    if (x, y) == grid.entrance() {
        return pair('.', '.', Color::DarkGrey, FLOOR);
    }
    pair(' ', ' ', FLOOR, FLOOR)
}
