//! TerraStream CLI - command-line interface
//!
//! This binary provides inspection and streaming tools on top of the
//! terrastream library.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{inspect, stream};

#[derive(Debug, Parser)]
#[command(name = "terrastream", version, about = "Streaming tools for 3D tile datasets")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Summarize a tileset's structure
    Inspect(inspect::InspectArgs),
    /// Stream a tileset from a fixed camera and report frame statistics
    Stream(stream::StreamArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Inspect(args) => inspect::run(args).await,
        Command::Stream(args) => stream::run(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
