//! Difficulty presets and the rule set they map to.
//!
//! Difficulty is a plain value handed to the session and the maze
//! generator at construction; the front end owns the one mutable choice.

use serde::Deserialize;

use super::error::SimError;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }

    pub fn rules(self) -> Rules {
        match self {
            Difficulty::Easy => Rules {
                detection_radius: 7,
                spawn_interval: 4.0,
                diamond_chance: 0.05,
                chaser_count: 2,
                ..Rules::default()
            },
            Difficulty::Normal => Rules::default(),
            Difficulty::Hard => Rules {
                detection_radius: 11,
                spawn_interval: 6.0,
                diamond_chance: 0.12,
                chaser_count: 4,
                ..Rules::default()
            },
        }
    }
}

/// Everything a session needs to know about pacing and economy.
#[derive(Clone, Debug, PartialEq)]
pub struct Rules {
    /// Manhattan distance inside which chasers switch from wander to pursuit.
    pub detection_radius: usize,
    /// Seconds survived per survival-gold award.
    pub survival_interval: f64,
    pub survival_gold: u32,
    /// Seconds between chaser moves.
    pub chaser_move_interval: f64,
    /// Seconds between loot spawn attempts.
    pub spawn_interval: f64,
    /// Probability that a spawn is a diamond rather than one gold.
    pub diamond_chance: f64,
    /// Gold credited per diamond picked up.
    pub diamond_bonus: u32,
    pub chaser_count: usize,
}

impl Default for Rules {
    fn default() -> Self {
        Rules {
            detection_radius: 9,
            survival_interval: 10.0,
            survival_gold: 1,
            chaser_move_interval: 0.6,
            spawn_interval: 5.0,
            diamond_chance: 0.08,
            diamond_bonus: 5,
            chaser_count: 3,
        }
    }
}

impl Rules {
    /// Intervals must be positive (the tick loop drains them in a
    /// `while`), and the diamond chance must be a probability.
    pub fn validate(&self) -> Result<(), SimError> {
        let intervals = [
            ("survival_interval", self.survival_interval),
            ("chaser_move_interval", self.chaser_move_interval),
            ("spawn_interval", self.spawn_interval),
        ];
        for (name, value) in intervals {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::InvalidRules(format!("{name} must be positive (got {value})")));
            }
        }
        if !(0.0..=1.0).contains(&self.diamond_chance) {
            return Err(SimError::InvalidRules(format!(
                "diamond_chance must be within [0, 1] (got {})",
                self.diamond_chance
            )));
        }
        Ok(())
    }
}
