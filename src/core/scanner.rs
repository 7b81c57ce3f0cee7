//! Cross-exchange arbitrage scanner.
//!
//! Periodically snapshots the price store and, for every symbol quoted on at
//! least two exchanges, compares the highest and lowest price. A spread at or
//! above the threshold yields one `OpportunityEvent` (buy at the lowest
//! quote, sell at the highest), logged and published on a broadcast channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::ArbitrageConfig;
use crate::core::store::{SharedPriceStore, StoreResult};
use crate::core::types::{OpportunityEvent, PriceSnapshot};

// =============================================================================
// Pure detection
// =============================================================================

/// Find every symbol whose max/min spread reaches `threshold_percent`.
///
/// Exchanges are visited in ascending id order and extremes only move on a
/// strictly better price, so ties resolve to the smallest exchange id.
pub fn scan(
    snapshot: &PriceSnapshot,
    threshold_percent: f64,
    detected_at: DateTime<Utc>,
) -> Vec<OpportunityEvent> {
    let mut events = Vec::new();

    for (symbol, quotes) in snapshot {
        // Need at least 2 exchanges
        if quotes.len() < 2 {
            continue;
        }

        let mut iter = quotes.iter();
        let Some((first_exchange, first_quote)) = iter.next() else {
            continue;
        };
        let (mut min_exchange, mut min_price) = (first_exchange, first_quote.price);
        let (mut max_exchange, mut max_price) = (first_exchange, first_quote.price);

        for (exchange, quote) in iter {
            if quote.price < min_price {
                min_exchange = exchange;
                min_price = quote.price;
            }
            if quote.price > max_price {
                max_exchange = exchange;
                max_price = quote.price;
            }
        }

        let spread_percent = (max_price - min_price) / min_price * 100.0;
        if spread_percent >= threshold_percent {
            events.push(OpportunityEvent {
                symbol: symbol.clone(),
                buy_exchange: min_exchange.clone(),
                buy_price: min_price,
                sell_exchange: max_exchange.clone(),
                sell_price: max_price,
                spread_percent,
                detected_at,
            });
        }
    }

    events
}

// =============================================================================
// Scanner task
// =============================================================================

/// Snapshot the store once, log and publish every opportunity found.
async fn scan_and_publish(
    store: &SharedPriceStore,
    threshold_percent: f64,
    events_tx: &broadcast::Sender<OpportunityEvent>,
) -> StoreResult<Vec<OpportunityEvent>> {
    let snapshot = store.snapshot().await?;
    let events = scan(&snapshot, threshold_percent, Utc::now());

    for event in &events {
        info!(
            symbol = %event.symbol,
            buy_exchange = %event.buy_exchange,
            buy_price = event.buy_price,
            sell_exchange = %event.sell_exchange,
            sell_price = event.sell_price,
            spread = format!("{:.4}%", event.spread_percent),
            "Arbitrage opportunity"
        );
        // Err only means nobody is subscribed
        let _ = events_tx.send(event.clone());
    }

    Ok(events)
}

/// Periodic scanner over a shared price store
pub struct ArbitrageScanner {
    store: SharedPriceStore,
    config: ArbitrageConfig,
    events_tx: broadcast::Sender<OpportunityEvent>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl ArbitrageScanner {
    pub fn new(store: SharedPriceStore, config: ArbitrageConfig) -> Self {
        let (events_tx, _) = broadcast::channel(config.channel_capacity.max(1));
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            store,
            config,
            events_tx,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            handle: None,
        }
    }

    /// Receive every opportunity published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<OpportunityEvent> {
        self.events_tx.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// One scan outside the periodic loop
    pub async fn scan_once(&self) -> StoreResult<Vec<OpportunityEvent>> {
        scan_and_publish(&self.store, self.config.threshold_percent, &self.events_tx).await
    }

    /// Spawn the periodic scan loop. No-op when already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        let store = Arc::clone(&self.store);
        let config = self.config.clone();
        let events_tx = self.events_tx.clone();
        let running = Arc::clone(&self.running);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        self.handle = Some(tokio::spawn(async move {
            info!(
                threshold = config.threshold_percent,
                interval_secs = config.detection_interval_secs,
                backend = store.backend_name(),
                "Arbitrage scanner started"
            );

            while running.load(Ordering::SeqCst) {
                let pause = match scan_and_publish(&store, config.threshold_percent, &events_tx).await {
                    Ok(_) => config.detection_interval(),
                    Err(e) => {
                        error!(error = %e, "Price snapshot failed");
                        config.error_delay()
                    }
                };

                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(pause) => {}
                }
            }

            info!("Arbitrage scanner stopped");
        }));
    }

    /// Stop the loop and wait for the task to finish
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.handle.take() {
            handle.abort();
            if let Err(e) = handle.await {
                if e.is_panic() {
                    warn!("Arbitrage scanner task panicked");
                }
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
