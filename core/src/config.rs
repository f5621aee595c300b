use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::*;

/// Edge length of one board tile in pixels.
pub const TILE_SIZE: u32 = 48;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub tile_size: u32,
    pub match_threshold: f32,
    /// Wait after the opening click before the first observation.
    pub start_delay_ms: u64,
    /// Wait after each batch of marks before observing again.
    pub settle_delay_ms: u64,
    /// Where to write board crops, color maps and grid dumps, if anywhere.
    pub debug_dir: Option<PathBuf>,
    pub palette: Palette,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            tile_size: TILE_SIZE,
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            start_delay_ms: 4000,
            settle_delay_ms: 500,
            debug_dir: None,
            palette: Palette::default(),
        }
    }
}

impl BotConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        if config.tile_size == 0 {
            return Err(SweepError::InvalidConfig("tile size must be positive".into()));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Same configuration with both waits removed.
    pub fn without_delays(self) -> Self {
        Self {
            start_delay_ms: 0,
            settle_delay_ms: 0,
            ..self
        }
    }
}
