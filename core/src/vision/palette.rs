use serde::{Deserialize, Serialize};

use super::Rgb;
use crate::Cell;

/// Inclusive per-channel color range.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorRange {
    pub min: Rgb,
    pub max: Rgb,
}

impl ColorRange {
    pub fn contains(&self, color: Rgb) -> bool {
        (self.min.0..=self.max.0).contains(&color.0)
            && (self.min.1..=self.max.1).contains(&color.1)
            && (self.min.2..=self.max.2).contains(&color.2)
    }
}

/// Calibration of the game skin: which sampled colors mean what.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    /// Exact block colors of the revealed counts 1, 2, 3, ...; at most 8 are used.
    pub numbers: Vec<Rgb>,
    /// Exact color of a flagged block.
    pub mine: Rgb,
    /// Color range of an empty dirt block.
    pub cleared: ColorRange,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            numbers: vec![
                Rgb(114, 153, 46),
                Rgb(174, 197, 42),
                Rgb(210, 186, 2),
                Rgb(207, 133, 2),
                Rgb(200, 80, 40),
                Rgb(170, 60, 120),
                Rgb(120, 60, 170),
                Rgb(60, 60, 60),
            ],
            mine: Rgb(220, 192, 194),
            cleared: ColorRange {
                min: Rgb(70, 55, 35),
                max: Rgb(90, 70, 50),
            },
        }
    }
}

impl Palette {
    /// Total: any color that is no number, flag or dirt reads as an unrevealed block.
    pub fn classify(&self, color: Rgb) -> Cell {
        let number = self
            .numbers
            .iter()
            .take(8)
            .position(|&known| known == color)
            .and_then(|index| Cell::from_count(index as u8 + 1));

        match number {
            Some(cell) => cell,
            None if color == self.mine => Cell::Mine,
            None if self.cleared.contains(color) => Cell::Cleared,
            None => Cell::Unknown,
        }
    }

    /// Representative color of `cell`, `None` when the palette has no entry for it.
    pub fn color_of(&self, cell: Cell) -> Option<Rgb> {
        match cell {
            Cell::Revealed(n) => self.numbers.get(usize::from(n).checked_sub(1)?).copied(),
            Cell::Mine => Some(self.mine),
            Cell::Cleared => Some(Rgb(
                midpoint(self.cleared.min.0, self.cleared.max.0),
                midpoint(self.cleared.min.1, self.cleared.max.1),
                midpoint(self.cleared.min.2, self.cleared.max.2),
            )),
            Cell::Unknown => None,
        }
    }
}

fn midpoint(a: u8, b: u8) -> u8 {
    ((u16::from(a) + u16::from(b)) / 2) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_colors_map_to_counts() {
        let palette = Palette::default();
        assert_eq!(palette.classify(Rgb(114, 153, 46)), Cell::Revealed(1));
        assert_eq!(palette.classify(Rgb(207, 133, 2)), Cell::Revealed(4));
        assert_eq!(palette.classify(Rgb(220, 192, 194)), Cell::Mine);
    }

    #[test]
    fn dirt_range_is_inclusive() {
        let palette = Palette::default();
        assert_eq!(palette.classify(Rgb(70, 55, 35)), Cell::Cleared);
        assert_eq!(palette.classify(Rgb(90, 70, 50)), Cell::Cleared);
        assert_eq!(palette.classify(Rgb(91, 70, 50)), Cell::Unknown);
        assert_eq!(palette.classify(Rgb(80, 54, 40)), Cell::Unknown);
    }

    #[test]
    fn everything_else_is_unknown() {
        let palette = Palette::default();
        assert_eq!(palette.classify(Rgb(86, 170, 60)), Cell::Unknown);
        assert_eq!(palette.classify(Rgb(0, 0, 0)), Cell::Unknown);
        assert_eq!(palette.classify(Rgb(114, 153, 47)), Cell::Unknown);
    }

    #[test]
    fn every_palette_color_classifies_back() {
        let palette = Palette::default();
        for cell in (1..=8).map(Cell::Revealed).chain([Cell::Mine, Cell::Cleared]) {
            let color = palette.color_of(cell).unwrap();
            assert_eq!(palette.classify(color), cell);
        }
        assert_eq!(palette.color_of(Cell::Unknown), None);
    }

    #[test]
    fn short_number_list_leaves_gaps() {
        let palette = Palette {
            numbers: vec![Rgb(1, 2, 3)],
            ..Palette::default()
        };
        assert_eq!(palette.color_of(Cell::Revealed(2)), None);
        assert_eq!(palette.classify(Rgb(174, 197, 42)), Cell::Unknown);
    }
}
