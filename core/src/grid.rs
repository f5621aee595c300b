use core::fmt;
use core::ops::Index;
use core::str::FromStr;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MarkOutcome {
    NoChange,
    Changed,
}

impl MarkOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Changed => true,
        }
    }
}

/// One observed snapshot of the board, indexed by `(row, column)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Array2<Cell>", into = "Array2<Cell>")]
pub struct Grid {
    cells: Array2<Cell>,
}

impl TryFrom<Array2<Cell>> for Grid {
    type Error = SweepError;

    fn try_from(cells: Array2<Cell>) -> Result<Self> {
        Self::from_cells(cells)
    }
}

impl From<Grid> for Array2<Cell> {
    fn from(grid: Grid) -> Self {
        grid.cells
    }
}

impl Grid {
    /// All-unknown grid of the given size.
    pub fn new(size: Coord2) -> Self {
        Self {
            cells: Array2::default(size.to_nd_index()),
        }
    }

    pub fn from_cells(cells: Array2<Cell>) -> Result<Self> {
        let (rows, cols) = cells.dim();
        if rows == 0 || cols == 0 || Coord::try_from(rows.max(cols)).is_err() {
            return Err(SweepError::InvalidGridShape);
        }
        Ok(Self { cells })
    }

    pub fn from_rows(rows: Vec<Vec<Cell>>) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return Err(SweepError::InvalidGridShape);
        }

        let flat = rows.into_iter().flatten().collect();
        let cells = Array2::from_shape_vec([height, width], flat)
            .map_err(|_| SweepError::InvalidGridShape)?;
        Self::from_cells(cells)
    }

    pub fn size(&self) -> Coord2 {
        let (rows, cols) = self.cells.dim();
        // from_cells guarantees both axes fit
        (rows as Coord, cols as Coord)
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        let size = self.size();
        if coords.0 < size.0 && coords.1 < size.1 {
            Ok(coords)
        } else {
            Err(SweepError::InvalidCoords)
        }
    }

    pub fn cell_at(&self, coords: Coord2) -> Option<Cell> {
        self.cells.get(coords.to_nd_index()).copied()
    }

    /// Turns an unknown cell into a mine. Revealed cells are left alone.
    pub fn mark_mine(&mut self, coords: Coord2) -> Result<MarkOutcome> {
        let coords = self.validate_coords(coords)?;
        let cell = &mut self.cells[coords.to_nd_index()];

        Ok(match *cell {
            Cell::Unknown => {
                *cell = Cell::Mine;
                MarkOutcome::Changed
            }
            Cell::Mine => MarkOutcome::NoChange,
            Cell::Cleared | Cell::Revealed(_) => {
                log::warn!("refusing to mark revealed cell {:?} as mine", coords);
                MarkOutcome::NoChange
            }
        })
    }

    /// Every coordinate in row-major order.
    pub fn iter_coords(&self) -> impl Iterator<Item = Coord2> + use<> {
        let (rows, cols) = self.size();
        (0..rows).flat_map(move |row| (0..cols).map(move |col| (row, col)))
    }

    pub fn iter_neighbors(&self, coords: Coord2) -> NeighborIter {
        self.cells.iter_neighbors(coords)
    }

    pub fn iter_neighbor_cells(&self, coords: Coord2) -> impl Iterator<Item = (Coord2, Cell)> {
        self.iter_neighbors(coords)
            .map(|pos| (pos, self.cells[pos.to_nd_index()]))
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&other| other == cell).count()
    }

    /// Keeps mines from `previous` that this fresh observation reads as unknown.
    ///
    /// Returns how many cells were carried over.
    pub fn carry_mines(&mut self, previous: &Grid) -> Result<usize> {
        if self.size() != previous.size() {
            return Err(SweepError::MalformedSnapshot {
                expected: previous.size(),
                actual: self.size(),
            });
        }

        let mut carried = 0;
        for coords in previous.iter_coords() {
            let index = coords.to_nd_index();
            if previous.cells[index].is_mine() && self.cells[index].is_unknown() {
                log::warn!("mine at {:?} re-observed as unknown, keeping it", coords);
                self.cells[index] = Cell::Mine;
                carried += 1;
            }
        }
        Ok(carried)
    }
}

impl Index<Coord2> for Grid {
    type Output = Cell;

    fn index(&self, coords: Coord2) -> &Self::Output {
        &self.cells[coords.to_nd_index()]
    }
}

/// Fixed-width text dump, one symbol per cell separated by spaces.
impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.rows() {
            let mut first = true;
            for cell in row {
                if !first {
                    f.write_str(" ")?;
                }
                write!(f, "{}", cell)?;
                first = false;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Parses the dump produced by `Display`, ignoring blank lines.
impl FromStr for Grid {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self> {
        let mut rows = Vec::new();
        for (line_no, line) in s.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let mut row = Vec::new();
            for token in line.split_whitespace() {
                let mut chars = token.chars();
                let cell = match (chars.next(), chars.next()) {
                    (Some(symbol), None) => Cell::from_symbol(symbol),
                    _ => None,
                };
                let Some(cell) = cell else {
                    return Err(SweepError::ParseGrid {
                        line: line_no + 1,
                        token: token.to_owned(),
                    });
                };
                row.push(cell);
            }
            rows.push(row);
        }
        Self::from_rows(rows)
    }
}
