//! All Circles CLI - Command-line interface
//!
//! Commands:
//! - serve: Start the HTTP game server
//! - simulate: Play unattended games with the scripted hero

mod server;
mod simulate;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "circles")]
#[command(about = "All Circles hex-grid tactical combat engine")]
struct Cli {
    /// Random seed (random when omitted)
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Catalog JSON file (built-in catalog when omitted)
    #[arg(long, global = true, value_name = "FILE")]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the game server
    Serve(server::ServerArgs),
    /// Play unattended games and report how far the hero got
    Simulate(simulate::SimulateArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(args) => server::run(args, cli.seed, cli.catalog),
        Commands::Simulate(args) => simulate::run(args, cli.seed, cli.catalog.as_deref()),
    }
}
