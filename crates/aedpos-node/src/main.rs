//! # AEDPoS Node
//!
//! Runs the in-process network until the configured number of rounds has
//! completed or Ctrl-C is pressed, then prints a JSON summary.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging (`RUST_LOG`, default `info`)
//! 2. Load configuration (defaults, `AEDPOS_CONFIG`, `AEDPOS_*` overrides)
//! 3. Create every node and initialize it with the genesis round
//! 4. Produce blocks on a blocking worker thread

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aedpos_node::{load_config, Simulation};
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("===========================================");
    info!("  AEDPoS Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");

    // Load configuration
    let config = load_config().context("Failed to load configuration")?;
    info!(
        miners = config.simulation.miners,
        rounds = config.simulation.rounds,
        mining_interval_ms = config.consensus.mining_interval_ms,
        time_each_term_secs = config.consensus.time_each_term_secs,
        "Configuration loaded"
    );

    let mut simulation = Simulation::new(config).context("Failed to create nodes")?;
    let stop = Arc::new(AtomicBool::new(false));
    let worker_stop = stop.clone();
    let mut worker = tokio::task::spawn_blocking(move || simulation.run(&worker_stop));

    let report = tokio::select! {
        joined = &mut worker => joined??,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            stop.store(true, Ordering::SeqCst);
            worker.await??
        }
    };

    info!(
        blocks = report.blocks,
        round = report.round_number,
        term = report.term_number,
        lib = report.last_irreversible_height,
        "Simulation finished"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
