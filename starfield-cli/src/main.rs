//! Starfield CLI - Command-line interface
//!
//! Runs star projections and great-circle waypoint searches on a worker
//! pool, and manages the configuration file.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::common::GlobalOverrides;
use commands::config::ConfigCommands;
use commands::project::ProjectArgs;
use commands::waypoints::WaypointsArgs;

#[derive(Parser)]
#[command(name = "starfield")]
#[command(version = starfield::VERSION)]
#[command(about = "Project star catalogs through sandboxed kernels on a worker pool", long_about = None)]
struct Cli {
    /// Enable debug-level logging (also mirrors logs to stdout)
    #[arg(long, global = true)]
    debug: bool,

    /// Number of workers (overrides [pool] workers)
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Star catalog file (overrides [catalog] path)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Compiled kernel module (overrides [kernel] path)
    #[arg(long, global = true)]
    kernel: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Project the whole catalog for an observer
    Project {
        /// Observer latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Observer longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Observation time (RFC 3339); defaults to now
        #[arg(long)]
        time: Option<String>,

        /// Number of consecutive frames to project
        #[arg(long, default_value = "1")]
        frames: u32,
    },

    /// Compute waypoints along the great circle between two points
    Waypoints {
        /// Start point as LAT,LON in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        from: String,

        /// End point as LAT,LON in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        to: String,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    let overrides = GlobalOverrides {
        debug: cli.debug,
        workers: cli.workers,
        catalog: cli.catalog,
        kernel: cli.kernel,
    };

    let result = match cli.command {
        Commands::Project {
            lat,
            lon,
            time,
            frames,
        } => commands::project::run(
            ProjectArgs {
                lat,
                lon,
                time,
                frames,
            },
            overrides,
        ),
        Commands::Waypoints { from, to } => {
            commands::waypoints::run(WaypointsArgs { from, to }, overrides)
        }
        Commands::Config { command } => commands::config::run(command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
