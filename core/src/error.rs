use thiserror::Error;

use crate::Coord2;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Board not found on screen")]
    BoardNotFound,
    #[error("Snapshot is {actual:?} but the board was detected as {expected:?}")]
    MalformedSnapshot { expected: Coord2, actual: Coord2 },
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Grid rows must be non-empty and of equal length")]
    InvalidGridShape,
    #[error("Unrecognized cell {token:?} on line {line}")]
    ParseGrid { line: usize, token: String },
    #[error("Too many mines")]
    TooManyMines,
    #[error("Game already ended, no new moves are accepted")]
    AlreadyEnded,
    #[error("Invalid image: {0}")]
    InvalidImage(String),
    #[error("Desktop interaction failed: {0}")]
    Desktop(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Could not parse configuration")]
    Config(#[from] toml::de::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = core::result::Result<T, SweepError>;
