use serde::{Deserialize, Serialize};

use crate::*;

/// Mines forced by a single clue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub clue: Coord2,
    /// Unknown neighbors of `clue`, row-major.
    pub mines: Vec<Coord2>,
}

/// What the satisfied-count rule says about one clue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClueCheck {
    /// Not a numbered cell.
    NotAClue,
    /// Every unrevealed neighbor must be a mine and some are still unknown.
    Forced(Vec<Coord2>),
    /// Every unrevealed neighbor is already a mine.
    Settled,
    /// More unrevealed neighbors than the clue asks for.
    Open { target: u8, unrevealed: u8 },
    /// Fewer unrevealed neighbors than the clue asks for.
    Contradiction { target: u8, unrevealed: u8 },
}

/// Applies the rule to the cell at `coords`.
///
/// Marked mines count as unrevealed, so a clue already satisfied by marks
/// never forces its remaining unknown neighbors.
pub fn check_clue(grid: &Grid, coords: Coord2) -> ClueCheck {
    let Some(target) = grid.cell_at(coords).and_then(Cell::clue) else {
        return ClueCheck::NotAClue;
    };

    let mut unrevealed = 0u8;
    let mut unknown = Vec::new();
    for (pos, cell) in grid.iter_neighbor_cells(coords) {
        if cell.is_unrevealed() {
            unrevealed += 1;
        }
        if cell.is_unknown() {
            unknown.push(pos);
        }
    }

    if unrevealed < target {
        ClueCheck::Contradiction { target, unrevealed }
    } else if unrevealed > target {
        ClueCheck::Open { target, unrevealed }
    } else if unknown.is_empty() {
        ClueCheck::Settled
    } else {
        ClueCheck::Forced(unknown)
    }
}

/// Scans row-major and returns the first clue that forces new mines.
pub fn find_deduction(grid: &Grid) -> Option<Deduction> {
    for clue in grid.iter_coords() {
        match check_clue(grid, clue) {
            ClueCheck::Forced(mines) => {
                log::debug!("clue {:?} forces {} mine(s)", clue, mines.len());
                return Some(Deduction { clue, mines });
            }
            ClueCheck::Contradiction { target, unrevealed } => {
                log::debug!(
                    "clue {:?} wants {} mines but only {} cells are unrevealed",
                    clue,
                    target,
                    unrevealed
                );
            }
            ClueCheck::NotAClue | ClueCheck::Settled | ClueCheck::Open { .. } => {}
        }
    }
    None
}

/// True when a full scan yields nothing new.
pub fn is_fixed_point(grid: &Grid) -> bool {
    find_deduction(grid).is_none()
}

/// Marks the deduced mines, returning the ones that actually changed.
pub fn apply_deduction(grid: &mut Grid, deduction: &Deduction) -> Result<Vec<Coord2>> {
    let mut marked = Vec::with_capacity(deduction.mines.len());
    for &coords in &deduction.mines {
        if grid.mark_mine(coords)?.has_update() {
            marked.push(coords);
        }
    }
    Ok(marked)
}
