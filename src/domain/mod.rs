pub mod ai;
pub mod difficulty;
pub mod entity;
pub mod error;
pub mod grid;
