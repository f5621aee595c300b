use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use sweepbot_core::sim::{
    EngineState, GameConfig, PlayEngine, RandomLayoutGenerator, SimCell, SimulatedDesktop, Skin,
    StartTile,
};
use sweepbot_core::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// What log level to use
    #[command(flatten)]
    verbose: clap_verbosity_flag::Verbosity,

    /// TOML file with tile size, delays and palette
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print the run report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Play a simulated game through screen captures and clicks
    Simulate {
        #[arg(long, default_value_t = 9)]
        rows: Coord,
        #[arg(long, default_value_t = 9)]
        cols: Coord,
        #[arg(long, default_value_t = 10)]
        mines: CellCount,
        /// Force a seed instead of random
        #[arg(short, long)]
        seed: Option<u64>,
        /// Keep the configured start and settle delays
        #[arg(long)]
        realtime: bool,
    },
    /// Deduce mines on a text grid dump
    Solve {
        /// Grid file, one line per row: `#` unknown, `.` cleared, `1`-`8`, `*` mine
        grid: PathBuf,
    },
    /// Locate the board on a saved capture and classify its tiles
    Locate {
        /// Screen capture as binary PPM
        frame: PathBuf,
        /// Directory of tile templates as binary PPM
        #[arg(short, long)]
        templates: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .init();

    let config = match &args.config {
        Some(path) => BotConfig::load(path)
            .with_context(|| format!("Could not load config {}", path.display()))?,
        None => BotConfig::default(),
    };

    match args.command {
        Command::Simulate {
            rows,
            cols,
            mines,
            seed,
            realtime,
        } => {
            let config = if realtime {
                config
            } else {
                config.without_delays()
            };
            simulate(GameConfig::new((rows, cols), mines), seed, config, args.json)
        }
        Command::Solve { grid } => solve(&grid, args.json),
        Command::Locate { frame, templates } => locate(&frame, &templates, &config),
    }
}

fn simulate(game: GameConfig, seed: Option<u64>, config: BotConfig, json: bool) -> anyhow::Result<()> {
    let seed = seed.unwrap_or_else(|| {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_nanos() as u64)
            .unwrap_or_default()
    });
    log::debug!("seed: {}", seed);

    let start = (game.size.0 / 2, game.size.1 / 2);
    let layout = RandomLayoutGenerator::new(seed, start, StartTile::AlwaysZero).generate(game);
    let mut desktop = SimulatedDesktop::new(
        PlayEngine::new(layout),
        Skin::new(config.palette.clone()),
        config.tile_size,
    );
    let templates = desktop.templates();

    let playfield = ScreenPlayfield::start(&mut desktop, &templates, config)?;
    let report = run_to_fixed_point(playfield)?;
    print_report(&report, json)?;

    let engine = desktop.engine();
    let wrong = report
        .marks
        .iter()
        .filter(|&&coords| !engine.layout().contains_mine(coords))
        .count();
    let flagged = report
        .marks
        .iter()
        .filter(|&&coords| engine.cell_at(coords) == SimCell::Flagged)
        .count();
    log::info!(
        "game {:?}, {} of {} mines flagged",
        engine.state(),
        flagged,
        engine.layout().mine_count()
    );
    if engine.state() == EngineState::Lost {
        bail!("simulated game was lost");
    }
    if wrong > 0 {
        bail!("{} mark(s) landed on safe cells", wrong);
    }
    Ok(())
}

fn solve(path: &Path, json: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read grid {}", path.display()))?;
    let grid: Grid = text
        .parse()
        .with_context(|| format!("Could not parse grid {}", path.display()))?;

    let report = run_to_fixed_point(MemoryPlayfield::new(grid))?;
    print_report(&report, json)
}

fn locate(frame: &Path, templates: &Path, config: &BotConfig) -> anyhow::Result<()> {
    let capture = load_ppm(frame)
        .with_context(|| format!("Could not load capture {}", frame.display()))?;
    let templates = load_templates(templates)
        .with_context(|| format!("Could not load templates from {}", templates.display()))?;

    let Some(bounds) = locate_board(
        &capture,
        &templates,
        config.match_threshold,
        config.tile_size,
    ) else {
        bail!(SweepError::BoardNotFound);
    };
    println!(
        "Board detected from {:?} to {:?}",
        bounds.top_left, bounds.bottom_right
    );

    let colors = sample_colors(
        &capture,
        &bounds,
        bounds.grid_size(config.tile_size),
        config.tile_size,
    )?;
    print!("{}", classify_colors(&colors, &config.palette)?);
    Ok(())
}

fn print_report(report: &RunReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for (row, col) in &report.marks {
        println!("mine {}, {}", row, col);
    }
    println!(
        "{} mine(s) in {} round(s), {} observation(s)",
        report.marks.len(),
        report.rounds,
        report.observations
    );
    print!("{}", report.grid);
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn simulate_defaults_to_beginner_board() {
        let args = Args::try_parse_from(["sweepbot", "simulate", "--seed", "3"]).unwrap();

        match args.command {
            Command::Simulate {
                rows,
                cols,
                mines,
                seed,
                realtime,
            } => {
                assert_eq!((rows, cols, mines), (9, 9, 10));
                assert_eq!(seed, Some(3));
                assert!(!realtime);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn simulated_game_never_flags_safe_cells() {
        let config = BotConfig {
            tile_size: 16,
            ..BotConfig::default()
        }
        .without_delays();

        for seed in 0..3 {
            simulate(GameConfig::new((6, 6), 5), Some(seed), config.clone(), true).unwrap();
        }
    }
}
