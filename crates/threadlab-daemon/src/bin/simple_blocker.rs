//! simple-blocker - standalone blocking scenario
//!
//! Starts one HOLDER and one WAITER on `blockingLock` without any HTTP
//! surface, then parks the main thread forever. Useful for pointing a thread
//! dump tool at a process that contains nothing but the pathology.
//!
//! Uses fixed-delay ordering: the WAITER starts after the grace period
//! regardless of whether the HOLDER has confirmed.

use anyhow::{Context, Result};
use clap::Parser;
use threadlab_core::{
    LabConfig, Latch, ScenarioConfig, ScenarioContext, ScenarioController, StartOrdering,
};
use threadlab_daemon::logging;
use tracing::info;

/// simple-blocker - hold a lock forever and block a second thread behind it
#[derive(Parser, Debug)]
#[command(name = "simple-blocker")]
#[command(version, about, long_about = None)]
struct Args {
    /// Delay before the blocked thread starts, in milliseconds
    #[arg(long, default_value_t = 1000)]
    grace_period_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level, None)?;

    let config = LabConfig {
        scenario: ScenarioConfig {
            grace_period_ms: args.grace_period_ms,
            start_ordering: StartOrdering::FixedDelay,
            ..ScenarioConfig::default()
        },
        ..LabConfig::default()
    };
    config.validate().context("invalid arguments")?;

    let controller = ScenarioController::new(ScenarioContext::new(), config.scenario);
    let ack = controller.start_blocking_scenario();
    info!(scenario = %ack.scenario, "{}", ack.message());

    // Keep the process alive; nothing ever opens this latch.
    Latch::new().wait();
    Ok(())
}
