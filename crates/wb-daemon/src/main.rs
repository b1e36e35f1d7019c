//! # wb-daemon
//!
//! HTTP API for the Weighbridge session core.
//!
//! Serves the session lifecycle (start, tare, dock, gross, invoice, exit),
//! session queries, and per-truck audit trails over JSON, backed by the
//! file stores under `<project-root>/.weighbridge/`.
//!
//! ## Usage
//!
//! ```text
//! wb-daemon --project-root /srv/yard --bind 0.0.0.0:5000
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `wb_session=info,wb_daemon=info`).

mod api;
mod config;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use wb_session::WeighbridgeConfig;

use crate::api::AppState;
use crate::config::DaemonConfig;

/// Weighbridge session HTTP daemon.
#[derive(Parser)]
#[command(name = "wb-daemon", version, about = "Weighbridge session HTTP daemon")]
struct Cli {
    /// Project root directory holding `.weighbridge/` (defaults to current directory).
    #[arg(long, default_value = ".")]
    project_root: PathBuf,

    /// Listen address; overrides `bind` in daemon.toml.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Path to daemon.toml (defaults to .weighbridge/daemon.toml).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("wb_session=info".parse()?)
                .add_directive("wb_daemon=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    std::fs::create_dir_all(&cli.project_root)?;
    let project_root = cli.project_root.canonicalize()?;
    let layout = WeighbridgeConfig::for_project(&project_root);

    let config_path = cli.config.unwrap_or_else(|| layout.daemon_config.clone());
    let mut config = DaemonConfig::load(&config_path)?;
    if let Some(bind) = cli.bind {
        config.bind = bind;
    }

    tracing::info!("Project root: {}", project_root.display());
    let lifecycle = layout.open_lifecycle()?;
    let state = AppState {
        lifecycle: Arc::new(lifecycle),
    };
    let app = api::router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    tracing::info!("Listening on http://{}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .inspect_err(|e| tracing::error!("serving error: {:?}", e))?;

    tracing::info!("Weighbridge daemon shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}
