use core::fmt;

use serde::{Deserialize, Serialize};

/// Classified state of one board tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    /// Not revealed yet, may be a mine or safe.
    Unknown,
    /// Revealed with no adjacent mines.
    Cleared,
    /// Revealed with exactly `n` adjacent mines, `n` in `1..=8`.
    Revealed(u8),
    /// Known mine, never downgraded during a run.
    Mine,
}

impl Cell {
    /// Maps an adjacent mine count to its revealed cell, `None` above 8.
    pub const fn from_count(count: u8) -> Option<Self> {
        match count {
            0 => Some(Self::Cleared),
            1..=8 => Some(Self::Revealed(count)),
            _ => None,
        }
    }

    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub const fn is_mine(self) -> bool {
        matches!(self, Self::Mine)
    }

    /// Unrevealed cells are the ones a clue's count can land on.
    pub const fn is_unrevealed(self) -> bool {
        matches!(self, Self::Unknown | Self::Mine)
    }

    pub const fn clue(self) -> Option<u8> {
        match self {
            Self::Revealed(n) => Some(n),
            _ => None,
        }
    }

    pub const fn symbol(self) -> char {
        match self {
            Self::Unknown => '#',
            Self::Cleared => '.',
            Self::Mine => '*',
            Self::Revealed(n) => match n {
                1 => '1',
                2 => '2',
                3 => '3',
                4 => '4',
                5 => '5',
                6 => '6',
                7 => '7',
                8 => '8',
                _ => '?',
            },
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '#' => Some(Self::Unknown),
            '.' | '0' => Some(Self::Cleared),
            '*' => Some(Self::Mine),
            digit => digit
                .to_digit(10)
                .and_then(|n| u8::try_from(n).ok())
                .and_then(Self::from_count),
        }
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_parse_back() {
        for cell in [Cell::Unknown, Cell::Cleared, Cell::Mine, Cell::Revealed(7)] {
            assert_eq!(Cell::from_symbol(cell.symbol()), Some(cell));
        }
    }

    #[test]
    fn counts_outside_range_are_rejected() {
        assert_eq!(Cell::from_count(0), Some(Cell::Cleared));
        assert_eq!(Cell::from_count(9), None);
        assert_eq!(Cell::from_symbol('9'), None);
        assert_eq!(Cell::from_symbol('x'), None);
    }
}
