//! # wb-cli
//!
//! Command-line operator tool for the Weighbridge session core.
//!
//! Works directly on the file stores under `<project-root>/.weighbridge/`:
//! - `wb session start/tare/dock/gross/invoice/exit` — advance a truck
//! - `wb session status/list` — inspect sessions
//! - `wb events <truck>` — a truck's audit trail, newest first
//! - `wb audit verify/tail` — check or skim the whole audit log

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use wb_session::WeighbridgeConfig;

/// Weighbridge CLI: drive and inspect truck sessions.
#[derive(Parser)]
#[command(name = "wb", version, about)]
struct Cli {
    /// Project root directory holding `.weighbridge/` (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Advance or inspect truck sessions.
    Session {
        #[command(subcommand)]
        command: commands::session::SessionCommands,
    },
    /// Show a truck's audit events.
    Events {
        /// Truck identifier.
        truck_id: String,
        /// Number of events to show.
        #[arg(short, default_value = "20")]
        n: usize,
    },
    /// Inspect the audit log.
    Audit {
        #[command(subcommand)]
        command: commands::audit::AuditCommands,
    },
}

fn main() -> anyhow::Result<()> {
    // Warnings only; stdout is for command output.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let project_root = cli.project_root.canonicalize().unwrap_or(cli.project_root);
    let config = WeighbridgeConfig::for_project(&project_root);
    tracing::debug!(data_dir = %config.data_dir.display(), "using weighbridge data directory");

    match &cli.command {
        Commands::Session { command } => commands::session::execute(command, &config),
        Commands::Events { truck_id, n } => commands::events::execute(&config, truck_id, *n),
        Commands::Audit { command } => commands::audit::execute(command, &config),
    }
}
