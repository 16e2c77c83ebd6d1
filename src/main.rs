// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use depthcue::DetectorPreset;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "depthcue")]
#[command(about = "Obstacle detection and audio cues from depth frames")]
#[command(version = depthcue::constants::app_info::version())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a synthetic camera toward an obstacle and print each cycle
    Simulate {
        /// Number of ticks to run
        #[arg(short, long, default_value = "150")]
        frames: u64,

        /// Tick rate (ticks per second)
        #[arg(long, default_value = "15")]
        fps: u32,

        /// Detector preset (sparse, dense, floor-aware)
        #[arg(short, long, default_value = "floor-aware", value_parser = cli::parse_preset)]
        preset: DetectorPreset,

        /// Configuration file (overrides the preset)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print one JSON object per cycle
        #[arg(long)]
        json: bool,

        /// Sleep between ticks to run at the tick rate (Ctrl+C stops)
        #[arg(long)]
        realtime: bool,
    },

    /// Run the pipeline over a 16-bit millimeter depth image
    Replay {
        /// Depth image (16-bit grayscale PNG, millimeters)
        input: PathBuf,

        /// Number of ticks to run over the image
        #[arg(short, long, default_value = "30")]
        frames: u64,

        /// Detector preset (sparse, dense, floor-aware)
        #[arg(short, long, value_parser = cli::parse_preset)]
        preset: Option<DetectorPreset>,

        /// Configuration file (overrides the preset)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration as JSON
    Config {
        /// Detector preset (sparse, dense, floor-aware)
        #[arg(short, long, value_parser = cli::parse_preset)]
        preset: Option<DetectorPreset>,

        /// Also write the configuration to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=depthcue=trace, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            frames,
            fps,
            preset,
            config,
            json,
            realtime,
        } => cli::simulate(
            cli::SimulateOptions {
                frames,
                fps,
                json,
                realtime,
            },
            &cli::resolve_config(Some(preset), config.as_deref())?,
        ),
        Commands::Replay {
            input,
            frames,
            preset,
            config,
        } => cli::replay(
            &input,
            frames,
            &cli::resolve_config(preset, config.as_deref())?,
        ),
        Commands::Config { preset, output } => {
            cli::print_config(&cli::resolve_config(preset, None)?, output.as_deref())
        }
    }
}
