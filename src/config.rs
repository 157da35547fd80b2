//! External configuration loader.
//!
//! Reads `config.toml` from the executable's directory (or CWD).
//! Falls back to sensible defaults if the file is missing or incomplete.

use log::warn;
use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::difficulty::{Difficulty, Rules};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    /// Starting difficulty; the title screen can change it.
    pub difficulty: Difficulty,
    pub tick_rate_ms: u64,
    pub maze_width: usize,
    pub maze_height: usize,
    pub maze_file: PathBuf,
    /// 0 = fresh seed every run.
    pub seed: u64,
    easy: Rules,
    normal: Rules,
    hard: Rules,
}

impl GameConfig {
    pub fn rules(&self, difficulty: Difficulty) -> &Rules {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Normal => &self.normal,
            Difficulty::Hard => &self.hard,
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    maze: TomlMaze,
    #[serde(default)]
    rules: TomlRulesTable,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default)]
    difficulty: Difficulty,
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_maze_file")]
    maze_file: String,
    #[serde(default)]
    seed: u64,
}

#[derive(Deserialize, Debug)]
struct TomlMaze {
    #[serde(default = "default_width")]
    width: usize,
    #[serde(default = "default_height")]
    height: usize,
}

#[derive(Deserialize, Debug, Default)]
struct TomlRulesTable {
    #[serde(default)]
    easy: TomlRules,
    #[serde(default)]
    normal: TomlRules,
    #[serde(default)]
    hard: TomlRules,
}

/// Per-difficulty overrides; unset keys keep the preset value.
#[derive(Deserialize, Debug, Default)]
struct TomlRules {
    detection_radius: Option<usize>,
    survival_interval: Option<f64>,
    survival_gold: Option<u32>,
    chaser_move_interval: Option<f64>,
    spawn_interval: Option<f64>,
    diamond_chance: Option<f64>,
    diamond_bonus: Option<u32>,
    chaser_count: Option<usize>,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 120 }
fn default_maze_file() -> String { "mazes.txt".into() }
fn default_width() -> usize { 41 }
fn default_height() -> usize { 21 }

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            difficulty: Difficulty::default(),
            tick_rate_ms: default_tick_rate(),
            maze_file: default_maze_file(),
            seed: 0,
        }
    }
}

impl Default for TomlMaze {
    fn default() -> Self {
        TomlMaze { width: default_width(), height: default_height() }
    }
}

impl TomlRules {
    /// Overlay onto a preset. An override that fails validation is
    /// dropped with a warning and the preset is kept whole.
    fn apply(&self, difficulty: Difficulty) -> Rules {
        let base = difficulty.rules();
        let rules = Rules {
            detection_radius: self.detection_radius.unwrap_or(base.detection_radius),
            survival_interval: self.survival_interval.unwrap_or(base.survival_interval),
            survival_gold: self.survival_gold.unwrap_or(base.survival_gold),
            chaser_move_interval: self.chaser_move_interval.unwrap_or(base.chaser_move_interval),
            spawn_interval: self.spawn_interval.unwrap_or(base.spawn_interval),
            diamond_chance: self.diamond_chance.unwrap_or(base.diamond_chance),
            diamond_bonus: self.diamond_bonus.unwrap_or(base.diamond_bonus),
            chaser_count: self.chaser_count.unwrap_or(base.chaser_count),
        };
        match rules.validate() {
            Ok(()) => rules,
            Err(e) => {
                warn!("config.toml [rules.{}]: {e}; using defaults", difficulty.name());
                base
            }
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);

        // Resolve the maze file against the same directories.
        let maze_file_str = &toml_cfg.general.maze_file;
        let maze_file = if PathBuf::from(maze_file_str).is_absolute() {
            PathBuf::from(maze_file_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(maze_file_str))
                .find(|p| p.is_file())
                .unwrap_or_else(|| PathBuf::from(maze_file_str))
        };

        let mut cfg = Self::from_toml(toml_cfg);
        cfg.maze_file = maze_file;
        cfg
    }

    /// Parse config text directly (no file search, paths left relative).
    #[allow(dead_code)]
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(Self::from_toml(toml_cfg))
    }

    fn from_toml(toml_cfg: TomlConfig) -> Self {
        let mut width = toml_cfg.maze.width;
        let mut height = toml_cfg.maze.height;
        if width < 5 || height < 5 {
            warn!("config.toml [maze]: {width}x{height} is too small; using defaults");
            width = default_width();
            height = default_height();
        }

        GameConfig {
            difficulty: toml_cfg.general.difficulty,
            tick_rate_ms: toml_cfg.general.tick_rate_ms.max(10),
            maze_width: width,
            maze_height: height,
            maze_file: PathBuf::from(&toml_cfg.general.maze_file),
            seed: toml_cfg.general.seed,
            easy: toml_cfg.rules.easy.apply(Difficulty::Easy),
            normal: toml_cfg.rules.normal.apply(Difficulty::Normal),
            hard: toml_cfg.rules.hard.apply(Difficulty::Hard),
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from_toml(TomlConfig::default())
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        // Resolve symlinks so a linked binary still finds data next to
        // the real one.
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        warn!("config.toml parse error: {e}; using default settings");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}
