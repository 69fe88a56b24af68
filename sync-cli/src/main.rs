//! # tidesync
//!
//! CLI tool for exercising the tidesync orchestrator without a server.
//!
//! ## Commands
//!
//! - `run`: Replay a scenario file against mock collaborators
//! - `table`: Print the transition table of the state machine
//!
//! ## Example
//!
//! ```bash
//! # Replay a scenario, one JSON snapshot per step
//! tidesync run scenarios/first-ever.toml --json
//!
//! # Show what happens while the app is in the background
//! tidesync table --background
//!
//! # Watch every transition
//! tidesync --log-level tidesync_core=debug run scenarios/first-ever.toml
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{run, table};

/// CLI tool for exercising the tidesync orchestrator.
#[derive(Parser, Debug)]
#[command(name = "tidesync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a scenario against mock collaborators
    Run {
        /// Scenario file (TOML)
        scenario: PathBuf,

        /// Print one JSON snapshot per step
        #[arg(long)]
        json: bool,
    },

    /// Print the transition table
    Table {
        /// Evaluate with the app in the background
        #[arg(long)]
        background: bool,

        /// Evaluate with the first-ever sync still pending
        #[arg(long)]
        first_ever: bool,

        /// Include events that change nothing
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { scenario, json } => {
            run::run(&scenario, json).await?;
        }
        Commands::Table {
            background,
            first_ever,
            all,
        } => {
            table::run(background, first_ever, all)?;
        }
    }

    Ok(())
}
