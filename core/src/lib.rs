//! Finds a tile board on screen, reads its cells from block colors and flags
//! every mine that a single numbered cell forces.

pub use cell::*;
pub use config::*;
pub use deduce::*;
pub use driver::*;
pub use error::*;
pub use grid::*;
pub use solver::*;
pub use types::*;
pub use vision::*;

mod cell;
mod config;
mod deduce;
mod driver;
mod error;
mod grid;
pub mod sim;
mod solver;
mod types;
mod vision;
