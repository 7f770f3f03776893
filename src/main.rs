use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tile_shift::config::load_config_or_default;
use tile_shift::logging::init_logging;
use tile_shift::*;

#[derive(Parser)]
#[command(name = "shift-tiles")]
#[command(about = "Shift and snap raster tiles to a bigger reference raster")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML or JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the shift of a tile without writing anything
    Print {
        /// Reference raster
        #[arg(short, long)]
        reference: PathBuf,

        /// Tile to align
        #[arg(short, long)]
        tile: PathBuf,

        /// Also save the result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a shifted copy of a tile
    Shift {
        /// Reference raster
        #[arg(short, long)]
        reference: PathBuf,

        /// Tile to align
        #[arg(short, long)]
        tile: PathBuf,

        /// Path of the shifted tile
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Shift many tiles in parallel
    Batch {
        /// Reference raster
        #[arg(short, long)]
        reference: PathBuf,

        /// Directory for shifted tiles
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Save a JSON report of every tile
        #[arg(long)]
        report: Option<PathBuf>,

        /// Tiles to align
        #[arg(required = true)]
        tiles: Vec<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config_or_default(cli.config.as_deref());
    match cli.verbose {
        0 => {}
        1 => config.logging = config.logging.with_level("info"),
        2 => config.logging = config.logging.with_level("debug"),
        _ => config.logging = config.logging.with_level("trace"),
    }
    let _log_guard = init_logging(&config.logging)?;

    match cli.command {
        Commands::Print { reference, tile, output } => handle_print(&config, reference, tile, output),
        Commands::Shift { reference, tile, output } => handle_shift(&config, reference, tile, output),
        Commands::Batch { reference, output_dir, report, tiles } => {
            handle_batch(&config, reference, output_dir, report, tiles)
        }
    }
}

fn load_reference(path: &Path) -> anyhow::Result<Raster> {
    read_geotiff(path).with_context(|| format!("Cannot open reference {}", path.display()))
}

fn print_result(found: &TileShift) {
    println!("{} {} {}", found.dx(), found.dy(), found.overlap.bits());
}

fn handle_print(config: &Config, reference: PathBuf, tile: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let reference = load_reference(&reference)?;
    let found = compute_shift(&reference, &tile, config)?;

    match &found {
        Some(found) => print_result(found),
        None => println!("Failed to calculate shift"),
    }

    if let Some(output_path) = output {
        let json = serde_json::to_string_pretty(&found)?;
        std::fs::write(&output_path, json)?;
        println!("Result saved to {}", output_path.display());
    }

    Ok(())
}

fn handle_shift(config: &Config, reference: PathBuf, tile: PathBuf, output: PathBuf) -> anyhow::Result<()> {
    let reference = load_reference(&reference)?;

    match apply_shift(&reference, &tile, &output, config)? {
        Some(found) => print_result(&found),
        None => println!("Failed to shift"),
    }

    Ok(())
}

fn handle_batch(
    config: &Config,
    reference: PathBuf,
    output_dir: PathBuf,
    report_path: Option<PathBuf>,
    tiles: Vec<PathBuf>,
) -> anyhow::Result<()> {
    let reference = load_reference(&reference)?;
    let report = run_batch(&reference, &tiles, &output_dir, config)?;

    for tile in &report.tiles {
        match (&tile.result, &tile.error) {
            (Some(found), _) => println!(
                "{}: {} {} {}",
                tile.tile.display(),
                found.dx(),
                found.dy(),
                found.overlap.bits()
            ),
            (None, Some(error)) => println!("{}: error: {}", tile.tile.display(), error),
            (None, None) => println!("{}: Failed to shift", tile.tile.display()),
        }
    }
    println!(
        "{} shifted, {} unmatched, {} failed",
        report.shifted(),
        report.unmatched(),
        report.failed()
    );

    if let Some(path) = report_path {
        report.save_json(&path)?;
        println!("Report saved to {}", path.display());
    }

    Ok(())
}
