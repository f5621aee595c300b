use ndarray::{Array2, s};
use serde::{Deserialize, Serialize};

use crate::*;

pub use matcher::*;
pub use palette::*;
pub use ppm::*;

mod matcher;
mod palette;
mod ppm;

/// 24-bit color in RGB order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// ITU-R BT.601 luma, the weighting screen grabbers use for grayscale.
    pub fn luma(self) -> f32 {
        0.299 * f32::from(self.0) + 0.587 * f32::from(self.1) + 0.114 * f32::from(self.2)
    }

    /// Scales every channel by `num / den`, saturating.
    pub fn scale(self, num: u32, den: u32) -> Self {
        let ch = |c: u8| (u32::from(c) * num / den).min(255) as u8;
        Self(ch(self.0), ch(self.1), ch(self.2))
    }
}

/// Captured screen image, indexed `[y, x]`.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pixels: Array2<Rgb>,
}

impl Frame {
    pub fn new(width: u32, height: u32, fill: Rgb) -> Self {
        Self {
            pixels: Array2::from_elem([height as usize, width as usize], fill),
        }
    }

    pub fn from_pixels(pixels: Array2<Rgb>) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.pixels.nrows() as u32
    }

    pub fn pixels(&self) -> &Array2<Rgb> {
        &self.pixels
    }

    pub fn pixel(&self, (x, y): Point) -> Option<Rgb> {
        self.pixels.get([y as usize, x as usize]).copied()
    }

    /// Fills the rectangle at `(x, y)`, clipped to the frame.
    pub fn fill_rect(&mut self, (x, y): Point, width: u32, height: u32, color: Rgb) {
        let x_end = (x.saturating_add(width)).min(self.width()) as usize;
        let y_end = (y.saturating_add(height)).min(self.height()) as usize;
        let (x, y) = (x as usize, y as usize);
        if x >= x_end || y >= y_end {
            return;
        }
        self.pixels.slice_mut(s![y..y_end, x..x_end]).fill(color);
    }

    /// Copies `other` into this frame at `(x, y)`, clipped.
    pub fn blit(&mut self, (x, y): Point, other: &Frame) {
        for ((oy, ox), &color) in other.pixels.indexed_iter() {
            let target = [y as usize + oy, x as usize + ox];
            if let Some(pixel) = self.pixels.get_mut(target) {
                *pixel = color;
            }
        }
    }

    /// Sub-image between two corners, clipped to the frame.
    pub fn crop(&self, (x0, y0): Point, (x1, y1): Point) -> Frame {
        let x1 = x1.min(self.width()) as usize;
        let y1 = y1.min(self.height()) as usize;
        let x0 = (x0 as usize).min(x1);
        let y0 = (y0 as usize).min(y1);
        Self {
            pixels: self.pixels.slice(s![y0..y1, x0..x1]).to_owned(),
        }
    }

    pub fn to_gray(&self) -> Array2<f32> {
        self.pixels.mapv(Rgb::luma)
    }
}

/// Pixel corners of the detected board, bottom-right exclusive.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardBounds {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl BoardBounds {
    pub fn width(&self) -> u32 {
        self.bottom_right.0.saturating_sub(self.top_left.0)
    }

    pub fn height(&self) -> u32 {
        self.bottom_right.1.saturating_sub(self.top_left.1)
    }

    /// Grid dimensions `(rows, columns)`, rounding to the nearest whole tile.
    pub fn grid_size(&self, tile: u32) -> Coord2 {
        let tiles = |len: u32| {
            let count = (len + tile / 2) / tile;
            Coord::try_from(count.max(1)).unwrap_or(Coord::MAX)
        };
        (tiles(self.height()), tiles(self.width()))
    }

    /// Screen position of the center of tile `(row, column)`.
    pub fn tile_center(&self, (row, col): Coord2, tile: u32) -> Point {
        (
            self.top_left.0 + u32::from(col) * tile + tile / 2,
            self.top_left.1 + u32::from(row) * tile + tile / 2,
        )
    }

    /// The tile containing the middle of the board.
    pub fn center_tile(&self, tile: u32) -> Coord2 {
        let (rows, cols) = self.grid_size(tile);
        (rows / 2, cols / 2)
    }
}
