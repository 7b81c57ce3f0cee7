//! Runtime orchestration
//!
//! Builds the price store, the enabled feeds and the scanner from one
//! `AppConfig`, and starts or stops them as a unit.

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::adapters::{create_enabled_feeds, AnyFeed, FeedAdapter};
use crate::config::{AppConfig, StoreBackend};
use crate::core::redis_store::RedisPriceStore;
use crate::core::scanner::ArbitrageScanner;
use crate::core::store::{MemoryPriceStore, SharedPriceStore};
use crate::core::types::OpportunityEvent;
use crate::error::AppError;

/// Create the store selected by `config.store.backend`
pub async fn build_store(config: &AppConfig) -> Result<SharedPriceStore, AppError> {
    match config.store.backend {
        StoreBackend::Memory => Ok(MemoryPriceStore::new().into_shared()),
        StoreBackend::Redis => {
            let store = RedisPriceStore::connect(&config.redis).await?;
            Ok(std::sync::Arc::new(store))
        }
    }
}

/// Owns the feeds and the scanner for the lifetime of the process
pub struct Orchestrator {
    store: SharedPriceStore,
    feeds: Vec<AnyFeed>,
    scanner: ArbitrageScanner,
}

impl Orchestrator {
    pub fn new(store: SharedPriceStore, feeds: Vec<AnyFeed>, scanner: ArbitrageScanner) -> Self {
        Self {
            store,
            feeds,
            scanner,
        }
    }

    /// Wire the enabled feeds and a scanner around `store`
    pub fn from_config(config: &AppConfig, store: SharedPriceStore) -> Result<Self, AppError> {
        let feeds = create_enabled_feeds(config, &store)?;
        let scanner = ArbitrageScanner::new(store.clone(), config.arbitrage.clone());
        Ok(Self::new(store, feeds, scanner))
    }

    /// Opportunities published by the scanner
    pub fn subscribe(&self) -> broadcast::Receiver<OpportunityEvent> {
        self.scanner.subscribe()
    }

    pub fn store(&self) -> &SharedPriceStore {
        &self.store
    }

    pub fn feeds(&self) -> &[AnyFeed] {
        &self.feeds
    }

    pub fn scanner(&self) -> &ArbitrageScanner {
        &self.scanner
    }

    /// Start every feed, then the scanner
    ///
    /// If a feed fails to start, the feeds already running are stopped and
    /// the error is returned.
    pub async fn start(&mut self) -> Result<(), AppError> {
        info!(
            feeds = self.feeds.len(),
            backend = self.store.backend_name(),
            "Starting price monitor"
        );

        for index in 0..self.feeds.len() {
            if let Err(e) = self.feeds[index].start().await {
                error!(
                    exchange = self.feeds[index].exchange_name(),
                    error = %e,
                    "Feed failed to start"
                );
                for started in self.feeds[..index].iter_mut() {
                    started.stop().await;
                }
                return Err(AppError::Exchange(e));
            }
        }

        self.scanner.start();
        info!("Price monitor running");
        Ok(())
    }

    /// Stop the feeds, then the scanner
    pub async fn stop(&mut self) {
        info!("Stopping price monitor");
        for feed in self.feeds.iter_mut() {
            feed.stop().await;
        }
        self.scanner.stop().await;
        info!("Price monitor stopped");
    }
}
