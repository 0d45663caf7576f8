//! threadlab-daemon - contention scenario trigger daemon
//!
//! Serves the trigger routes (`/block`, `/deadlock`) that start the scenario
//! engine, plus `/workers` and `/metrics` for inspection. Workers started by
//! a trigger are never reaped; the pathological lock states they create last
//! until the process exits.
//!
//! The Tokio runtime is constructed explicitly in a synchronous `main` so
//! argument parsing happens before any runtime threads exist.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use threadlab_core::{LabConfig, ScenarioContext, ScenarioController};
use threadlab_daemon::handlers;
use threadlab_daemon::logging;
use threadlab_daemon::metrics::new_shared_registry;
use threadlab_daemon::state::{DaemonStateHandle, SharedState};
use tokio::net::TcpListener;
use tracing::{info, warn};

/// threadlab daemon - reproducible lock blocking and deadlocks on demand
#[derive(Parser, Debug)]
#[command(name = "threadlab-daemon")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "threadlab.toml")]
    config: PathBuf,

    /// Listen address (overrides `daemon.listen_addr`)
    #[arg(long)]
    listen: Option<SocketAddr>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log to file instead of stdout
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let runtime = tokio::runtime::Runtime::new().context("failed to create Tokio runtime")?;
    runtime.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<()> {
    logging::init(&args.log_level, args.log_file.as_deref())?;

    let config = if args.config.exists() {
        LabConfig::from_file(&args.config).context("failed to load configuration")?
    } else {
        info!(path = %args.config.display(), "no configuration file, using defaults");
        LabConfig::default()
    };
    let listen_addr = args.listen.unwrap_or(config.daemon.listen_addr);

    info!(
        grace_period_ms = config.scenario.grace_period_ms,
        hold_delay_ms = config.scenario.hold_delay_ms,
        start_ordering = ?config.scenario.start_ordering,
        "scenario timings"
    );

    let controller = Arc::new(ScenarioController::new(
        ScenarioContext::new(),
        config.scenario,
    ));
    let metrics = new_shared_registry().context("failed to create metrics registry")?;
    let state: SharedState = Arc::new(DaemonStateHandle::new(controller, metrics));

    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind trigger listener on {listen_addr}"))?;

    handlers::serve(listener, Arc::clone(&state), shutdown_signal()).await?;

    info!(
        workers = state.controller().context().workers().len(),
        "threadlab daemon stopped, workers exit with the process"
    );
    Ok(())
}

/// Resolves on SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}
