//! Construction-time failures of the simulation core.
//!
//! These are caller errors, not runtime conditions: they surface from
//! constructors and setters and are never produced mid-tick.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("grid dimensions {width}x{height} are too small")]
    InvalidDimensions { width: usize, height: usize },
    #[error("position ({x}, {y}) is outside the grid")]
    OutOfBounds { x: usize, y: usize },
    #[error("position ({x}, {y}) is a wall")]
    NotWalkable { x: usize, y: usize },
    #[error("gold amount must not be negative (got {0})")]
    NegativeGold(i32),
    #[error("invalid rules: {0}")]
    InvalidRules(String),
}
