use std::collections::{BTreeSet, VecDeque};

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::MineLayout;
use crate::*;

/// Player-visible state of one tile in the simulated game.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum SimCell {
    #[default]
    Hidden,
    Revealed(u8),
    Flagged,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum EngineState {
    #[default]
    Ready,
    Active,
    Won,
    Lost,
}

impl EngineState {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    HitMine,
    Won,
}

/// Rules of the simulated game: flood-fill reveal and flag toggling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayEngine {
    mine_layout: MineLayout,
    board: Array2<SimCell>,
    revealed_count: CellCount,
    state: EngineState,
}

impl PlayEngine {
    pub fn new(mine_layout: MineLayout) -> Self {
        let size = mine_layout.size();
        Self {
            mine_layout,
            board: Array2::default(size.to_nd_index()),
            revealed_count: 0,
            state: EngineState::default(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn size(&self) -> Coord2 {
        self.mine_layout.size()
    }

    pub fn layout(&self) -> &MineLayout {
        &self.mine_layout
    }

    pub fn cell_at(&self, coords: Coord2) -> SimCell {
        self.board[coords.to_nd_index()]
    }

    pub fn toggle_flag(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        let coords = self.mine_layout.validate_coords(coords)?;
        self.check_not_finished()?;

        let cell = &mut self.board[coords.to_nd_index()];
        Ok(match *cell {
            SimCell::Hidden => {
                *cell = SimCell::Flagged;
                MarkOutcome::Changed
            }
            SimCell::Flagged => {
                *cell = SimCell::Hidden;
                MarkOutcome::Changed
            }
            SimCell::Revealed(_) => MarkOutcome::NoChange,
        })
    }

    pub fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        let coords = self.mine_layout.validate_coords(coords)?;
        if self.cell_at(coords) != SimCell::Hidden {
            return Ok(RevealOutcome::NoChange);
        }
        self.check_not_finished()?;

        if self.mine_layout.contains_mine(coords) {
            self.state = EngineState::Lost;
            return Ok(RevealOutcome::HitMine);
        }

        let mut visited = BTreeSet::new();
        let mut to_visit = VecDeque::from([coords]);
        while let Some(visit) = to_visit.pop_front() {
            if !visited.insert(visit) || self.cell_at(visit) != SimCell::Hidden {
                continue;
            }

            let adjacent_mines = self.mine_layout.adjacent_mine_count(visit);
            self.board[visit.to_nd_index()] = SimCell::Revealed(adjacent_mines);
            self.revealed_count += 1;

            if adjacent_mines == 0 {
                to_visit.extend(
                    self.mine_layout
                        .iter_neighbors(visit)
                        .filter(|pos| !visited.contains(pos)),
                );
            }
        }

        if self.revealed_count == self.mine_layout.safe_cell_count() {
            self.state = EngineState::Won;
            Ok(RevealOutcome::Won)
        } else {
            self.state = EngineState::Active;
            Ok(RevealOutcome::Revealed)
        }
    }

    fn check_not_finished(&self) -> Result<()> {
        if self.state.is_finished() {
            Err(SweepError::AlreadyEnded)
        } else {
            Ok(())
        }
    }
}
