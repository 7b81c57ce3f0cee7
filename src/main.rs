//! Spread Watch - Entry Point
//!
//! Orchestrates:
//! 1. Config + logging initialization
//! 2. Price store (memory or Redis)
//! 3. Feeds + arbitrage scanner via the Orchestrator
//! 4. Opportunity consumer
//! 5. Ctrl+C graceful shutdown

use std::path::PathBuf;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use spread_watch::config::{init_logging, load_config};
use spread_watch::core::{build_store, Orchestrator};

/// Config file used when CONFIG_PATH is unset
const DEFAULT_CONFIG_PATH: &str = "config.yaml";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // =========================================================================
    // 1. Config + logging
    // =========================================================================
    dotenvy::dotenv().ok();

    let config_path = std::env::var("CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = load_config(&config_path)?;

    init_logging(&config.log_level);
    info!(
        config = %config_path.display(),
        store = %config.store.backend,
        threshold = config.arbitrage.threshold_percent,
        "=== Spread Watch ==="
    );

    // =========================================================================
    // 2. Store + orchestrator
    // =========================================================================
    let store = build_store(&config).await?;
    let mut orchestrator = Orchestrator::from_config(&config, store)?;
    let mut opportunity_rx = orchestrator.subscribe();

    if let Err(e) = orchestrator.start().await {
        error!(error = %e, "Startup failed");
        return Err(e.into());
    }

    // =========================================================================
    // 3. Opportunity consumer
    // =========================================================================
    let consumer = tokio::spawn(async move {
        let mut received: u64 = 0;
        loop {
            match opportunity_rx.recv().await {
                Ok(event) => {
                    received += 1;
                    match serde_json::to_string(&event) {
                        Ok(json) => debug!(opportunity = %json, "Opportunity received"),
                        Err(e) => warn!(error = %e, "Failed to serialize opportunity"),
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "Opportunity consumer lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        received
    });

    // =========================================================================
    // 4. Wait for Ctrl+C → graceful shutdown
    // =========================================================================
    info!("Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    orchestrator.stop().await;
    // Dropping the orchestrator closes the opportunity channel
    drop(orchestrator);
    match consumer.await {
        Ok(total) => info!(opportunities = total, "Consumer finished"),
        Err(e) => error!(error = %e, "Consumer task failed"),
    }

    info!("Shutdown complete");
    Ok(())
}
