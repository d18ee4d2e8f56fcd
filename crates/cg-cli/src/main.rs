//! CLI frontend for the Chargegrid charge network engine.

mod commands;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "cg",
    about = "Chargegrid: connectivity and pooled charge for block layouts",
    version,
    propagate_version = true
)]
struct Cli {
    /// Log filter, e.g. `info` or `cg_network=debug` (default: $RUST_LOG, then `warn`)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample layout file
    Init {
        /// Path of the layout file to create
        path: PathBuf,
    },

    /// Load and validate a layout file
    Check {
        /// Layout file (JSON)
        layout: PathBuf,
    },

    /// Build the charge network for a layout and tick it
    Simulate {
        /// Layout file (JSON)
        layout: PathBuf,

        /// Number of ticks to run
        #[arg(short, long, default_value = "1")]
        ticks: u64,

        /// Register blocks one per tick, in a random order from this seed
        #[arg(short, long)]
        shuffle: Option<u64>,

        /// Draw charge after every tick, as `x,y,z=amount` (repeatable)
        #[arg(short, long)]
        draw: Vec<String>,

        /// Deregister a block after the first tick, as `x,y,z` (repeatable)
        #[arg(short, long)]
        remove: Vec<String>,

        /// Show the network event log
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let result = match cli.command {
        Commands::Init { path } => commands::init::run(&path),
        Commands::Check { layout } => commands::check::run(&layout),
        Commands::Simulate {
            layout,
            ticks,
            shuffle,
            draw,
            remove,
            verbose,
        } => commands::simulate::run(&layout, ticks, shuffle, &draw, &remove, verbose),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
