use std::path::{Path, PathBuf};

use ndarray::Array2;

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// Screen capture and mouse input of the machine the game runs on.
pub trait Desktop {
    /// Captures the whole screen.
    fn capture(&mut self) -> Result<Frame>;

    fn click(&mut self, at: Point, button: MouseButton) -> Result<()>;
}

impl<D: Desktop + ?Sized> Desktop for &mut D {
    fn capture(&mut self) -> Result<Frame> {
        (**self).capture()
    }

    fn click(&mut self, at: Point, button: MouseButton) -> Result<()> {
        (**self).click(at, button)
    }
}

/// Samples the center pixel of every tile, `[row, column]`.
pub fn sample_colors(
    frame: &Frame,
    bounds: &BoardBounds,
    size: Coord2,
    tile: u32,
) -> Result<Array2<Rgb>> {
    let mut colors = Array2::default(size.to_nd_index());
    for coords in Grid::new(size).iter_coords() {
        let center = bounds.tile_center(coords, tile);
        let color = frame.pixel(center).ok_or_else(|| {
            SweepError::InvalidImage(format!("tile center {:?} is outside the capture", center))
        })?;
        log::trace!("{}, {}, {:?}", coords.0, coords.1, color);
        colors[coords.to_nd_index()] = color;
    }
    Ok(colors)
}

pub fn classify_colors(colors: &Array2<Rgb>, palette: &Palette) -> Result<Grid> {
    Grid::from_cells(colors.mapv(|color| palette.classify(color)))
}

/// Captures the screen and finds the board, failing with `BoardNotFound`.
pub fn detect_board(
    desktop: &mut impl Desktop,
    templates: &[Frame],
    config: &BotConfig,
) -> Result<BoardBounds> {
    let frame = desktop.capture()?;
    let bounds = locate_board(&frame, templates, config.match_threshold, config.tile_size)
        .ok_or(SweepError::BoardNotFound)?;
    log::info!(
        "board detected from {:?} to {:?}",
        bounds.top_left,
        bounds.bottom_right
    );

    if let Some(dir) = &config.debug_dir {
        DebugArtifacts::new(dir).save_board(&frame, &bounds, "game_board.ppm")?;
    }
    Ok(bounds)
}

/// Opens the game with one left-click on the middle tile.
pub fn click_center(desktop: &mut impl Desktop, bounds: &BoardBounds, tile: u32) -> Result<()> {
    let at = bounds.tile_center(bounds.center_tile(tile), tile);
    log::debug!("opening click at {:?}", at);
    desktop.click(at, MouseButton::Left)
}

/// Writes diagnostic images and dumps, the run does not depend on them.
#[derive(Clone, Debug)]
pub struct DebugArtifacts {
    dir: PathBuf,
}

impl DebugArtifacts {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn save_board(&self, frame: &Frame, bounds: &BoardBounds, name: &str) -> Result<()> {
        self.save(&frame.crop(bounds.top_left, bounds.bottom_right), name)
    }

    /// One pixel per tile, in the sampled color.
    pub fn save_color_map(&self, colors: &Array2<Rgb>, name: &str) -> Result<()> {
        self.save(&Frame::from_pixels(colors.clone()), name)
    }

    pub fn save_grid(&self, grid: &Grid, name: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.dir.join(name), grid.to_string())?;
        Ok(())
    }

    fn save(&self, frame: &Frame, name: &str) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        save_ppm(frame, &path)?;
        log::debug!("wrote {}", path.display());
        Ok(())
    }
}

/// Playfield read from screen captures and driven by mouse clicks.
#[derive(Debug)]
pub struct ScreenPlayfield<D> {
    desktop: D,
    bounds: BoardBounds,
    size: Coord2,
    config: BotConfig,
    debug: Option<DebugArtifacts>,
}

impl<D: Desktop> ScreenPlayfield<D> {
    pub fn new(desktop: D, bounds: BoardBounds, config: BotConfig) -> Self {
        let size = bounds.grid_size(config.tile_size);
        let debug = config.debug_dir.as_deref().map(DebugArtifacts::new);
        Self {
            desktop,
            bounds,
            size,
            config,
            debug,
        }
    }

    /// Detects the board, clicks it open and waits for it to settle.
    pub fn start(mut desktop: D, templates: &[Frame], config: BotConfig) -> Result<Self> {
        let bounds = detect_board(&mut desktop, templates, &config)?;
        click_center(&mut desktop, &bounds, config.tile_size)?;
        std::thread::sleep(config.start_delay());
        Ok(Self::new(desktop, bounds, config))
    }

    pub fn desktop(&self) -> &D {
        &self.desktop
    }
}

impl<D: Desktop> Playfield for ScreenPlayfield<D> {
    fn observe(&mut self) -> Result<Grid> {
        let frame = self.desktop.capture()?;
        let colors = sample_colors(&frame, &self.bounds, self.size, self.config.tile_size)?;
        let grid = classify_colors(&colors, &self.config.palette)?;

        if let Some(debug) = &self.debug {
            debug.save_board(&frame, &self.bounds, "game_board_latest.ppm")?;
            debug.save_color_map(&colors, "board_image.ppm")?;
            debug.save_grid(&grid, "levels.txt")?;
        }
        Ok(grid)
    }

    fn mark_mine(&mut self, coords: Coord2) -> Result<()> {
        let at = self.bounds.tile_center(coords, self.config.tile_size);
        self.desktop.click(at, MouseButton::Right)
    }

    fn settle(&mut self) {
        std::thread::sleep(self.config.settle_delay());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TILE: u32 = 4;

    /// Static screen that records clicks.
    #[derive(Debug)]
    struct StillDesktop {
        frame: Frame,
        clicks: Vec<(Point, MouseButton)>,
    }

    impl Desktop for StillDesktop {
        fn capture(&mut self) -> Result<Frame> {
            Ok(self.frame.clone())
        }

        fn click(&mut self, at: Point, button: MouseButton) -> Result<()> {
            self.clicks.push((at, button));
            Ok(())
        }
    }

    fn board_frame(palette: &Palette) -> (Frame, BoardBounds) {
        let mut frame = Frame::new(20, 12, Rgb(255, 255, 255));
        let bounds = BoardBounds {
            top_left: (2, 2),
            bottom_right: (2 + 3 * TILE, 2 + 2 * TILE),
        };
        let cells = [
            [Cell::Revealed(1), Cell::Unknown, Cell::Cleared],
            [Cell::Mine, Cell::Revealed(3), Cell::Unknown],
        ];
        for (row, line) in cells.iter().enumerate() {
            for (col, &cell) in line.iter().enumerate() {
                let color = palette.color_of(cell).unwrap_or(Rgb(86, 170, 60));
                let x = bounds.top_left.0 + col as u32 * TILE;
                let y = bounds.top_left.1 + row as u32 * TILE;
                frame.fill_rect((x, y), TILE, TILE, color);
            }
        }
        (frame, bounds)
    }

    fn config() -> BotConfig {
        BotConfig {
            tile_size: TILE,
            ..BotConfig::default()
        }
        .without_delays()
    }

    #[test]
    fn observe_classifies_every_tile() {
        let palette = Palette::default();
        let (frame, bounds) = board_frame(&palette);
        let desktop = StillDesktop {
            frame,
            clicks: Vec::new(),
        };
        let mut playfield = ScreenPlayfield::new(desktop, bounds, config());

        let grid = playfield.observe().unwrap();

        assert_eq!(grid.to_string(), "1 # .\n* 3 #\n");
    }

    #[test]
    fn observe_writes_debug_artifacts() {
        let dir = std::env::temp_dir().join(format!("sweepbot-debug-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let (frame, bounds) = board_frame(&Palette::default());
        let desktop = StillDesktop {
            frame,
            clicks: Vec::new(),
        };
        let config = BotConfig {
            debug_dir: Some(dir.clone()),
            ..config()
        };
        let mut playfield = ScreenPlayfield::new(desktop, bounds, config);

        let grid = playfield.observe().unwrap();

        let board = load_ppm(&dir.join("game_board_latest.ppm")).unwrap();
        assert_eq!((board.width(), board.height()), (3 * TILE, 2 * TILE));
        let color_map = load_ppm(&dir.join("board_image.ppm")).unwrap();
        assert_eq!((color_map.width(), color_map.height()), (3, 2));
        assert_eq!(
            color_map.pixel((1, 1)),
            Palette::default().color_of(Cell::Revealed(3))
        );
        let levels = std::fs::read_to_string(dir.join("levels.txt")).unwrap();
        assert_eq!(levels.parse::<Grid>().unwrap(), grid);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn mark_mine_right_clicks_tile_center() {
        let (frame, bounds) = board_frame(&Palette::default());
        let desktop = StillDesktop {
            frame,
            clicks: Vec::new(),
        };
        let mut playfield = ScreenPlayfield::new(desktop, bounds, config());

        playfield.mark_mine((1, 2)).unwrap();

        assert_eq!(
            playfield.desktop().clicks,
            vec![((2 + 2 * TILE + 2, 2 + TILE + 2), MouseButton::Right)]
        );
    }

    #[test]
    fn sampling_outside_capture_fails() {
        let frame = Frame::new(8, 8, Rgb(0, 0, 0));
        let bounds = BoardBounds {
            top_left: (4, 4),
            bottom_right: (12, 12),
        };

        let err = sample_colors(&frame, &bounds, (2, 2), TILE).unwrap_err();

        assert!(matches!(err, SweepError::InvalidImage(_)));
    }

    #[test]
    fn missing_board_is_reported() {
        let mut desktop = StillDesktop {
            frame: Frame::new(16, 16, Rgb(0, 0, 0)),
            clicks: Vec::new(),
        };
        let mut template = Frame::new(TILE, TILE, Rgb(10, 10, 10));
        template.fill_rect((1, 1), 2, 2, Rgb(200, 200, 200));

        let err = ScreenPlayfield::start(&mut desktop, &[template], config()).unwrap_err();

        assert!(matches!(err, SweepError::BoardNotFound));
        assert!(desktop.clicks.is_empty());
    }
}
