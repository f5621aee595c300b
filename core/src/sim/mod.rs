//! In-process stand-in for the external game, rendered into screen captures.

pub use engine::*;
pub use layout::*;

mod engine;
mod layout;

use crate::*;

/// Rendering colors of the simulated game.
#[derive(Clone, Debug, PartialEq)]
pub struct Skin {
    pub grass: Rgb,
    pub background: Rgb,
    pub palette: Palette,
}

impl Skin {
    pub fn new(palette: Palette) -> Self {
        Self {
            grass: Rgb(86, 170, 60),
            background: Rgb(235, 235, 235),
            palette,
        }
    }

    pub fn color_of(&self, cell: SimCell) -> Rgb {
        let shown = match cell {
            SimCell::Hidden => return self.grass,
            SimCell::Flagged => Cell::Mine,
            SimCell::Revealed(count) => Cell::from_count(count).unwrap_or(Cell::Unknown),
        };
        // a count the palette cannot show renders as an unreadable block
        self.palette.color_of(shown).unwrap_or(Rgb(255, 0, 255))
    }
}

/// A screen showing one simulated game, with the board surrounded by a margin.
#[derive(Clone, Debug)]
pub struct SimulatedDesktop {
    engine: PlayEngine,
    skin: Skin,
    tile: u32,
    origin: Point,
    clicks: Vec<(Point, MouseButton)>,
}

impl SimulatedDesktop {
    pub fn new(engine: PlayEngine, skin: Skin, tile: u32) -> Self {
        Self {
            engine,
            skin,
            tile,
            origin: (tile / 2, tile / 2),
            clicks: Vec::new(),
        }
    }

    pub fn engine(&self) -> &PlayEngine {
        &self.engine
    }

    pub fn clicks(&self) -> &[(Point, MouseButton)] {
        &self.clicks
    }

    /// Where the board really is on the simulated screen.
    pub fn board_bounds(&self) -> BoardBounds {
        let (rows, cols) = self.engine.size();
        BoardBounds {
            top_left: self.origin,
            bottom_right: (
                self.origin.0 + u32::from(cols) * self.tile,
                self.origin.1 + u32::from(rows) * self.tile,
            ),
        }
    }

    /// One beveled block: a darker rim around the flat block color.
    pub fn render_tile(&self, color: Rgb) -> Frame {
        let rim = (self.tile / 16).max(1);
        let mut frame = Frame::new(self.tile, self.tile, color.scale(3, 4));
        frame.fill_rect(
            (rim, rim),
            self.tile.saturating_sub(2 * rim),
            self.tile.saturating_sub(2 * rim),
            color,
        );
        frame
    }

    /// Tile images to locate the board with: untouched grass and empty dirt.
    pub fn templates(&self) -> Vec<Frame> {
        vec![
            self.render_tile(self.skin.grass),
            self.render_tile(self.skin.color_of(SimCell::Revealed(0))),
        ]
    }

    pub fn render(&self) -> Frame {
        let bounds = self.board_bounds();
        let mut frame = Frame::new(
            bounds.bottom_right.0 + self.origin.0,
            bounds.bottom_right.1 + self.origin.1,
            self.skin.background,
        );

        let (rows, cols) = self.engine.size();
        for row in 0..rows {
            for col in 0..cols {
                let color = self.skin.color_of(self.engine.cell_at((row, col)));
                let at = (
                    self.origin.0 + u32::from(col) * self.tile,
                    self.origin.1 + u32::from(row) * self.tile,
                );
                frame.blit(at, &self.render_tile(color));
            }
        }
        frame
    }

    fn tile_at(&self, (x, y): Point) -> Option<Coord2> {
        let bounds = self.board_bounds();
        if x < bounds.top_left.0
            || y < bounds.top_left.1
            || x >= bounds.bottom_right.0
            || y >= bounds.bottom_right.1
        {
            return None;
        }
        let col = (x - bounds.top_left.0) / self.tile;
        let row = (y - bounds.top_left.1) / self.tile;
        Some((Coord::try_from(row).ok()?, Coord::try_from(col).ok()?))
    }
}

impl Desktop for SimulatedDesktop {
    fn capture(&mut self) -> Result<Frame> {
        Ok(self.render())
    }

    fn click(&mut self, at: Point, button: MouseButton) -> Result<()> {
        self.clicks.push((at, button));
        let Some(coords) = self.tile_at(at) else {
            log::trace!("click at {:?} missed the board", at);
            return Ok(());
        };

        let outcome = match button {
            MouseButton::Left => self.engine.reveal(coords).map(|outcome| {
                log::debug!("reveal {:?}: {:?}", coords, outcome);
            }),
            MouseButton::Right => self.engine.toggle_flag(coords).map(|_| ()),
        };

        match outcome {
            // a finished game just ignores input
            Err(SweepError::AlreadyEnded) => {
                log::warn!("game already ended, ignoring click at {:?}", coords);
                Ok(())
            }
            other => other,
        }
    }
}
