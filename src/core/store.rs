//! Shared latest-price store
//!
//! One `Quote` per (symbol, exchange), last write wins, entries are never
//! removed. Feeds write through `upsert`, the scanner reads through
//! `snapshot`. Both sides go through the same lock so a reader can never
//! observe a price without its timestamp.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::core::types::{ExchangeQuotes, PriceSnapshot, PriceUpdate, Quote};

/// Errors raised by a price store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Backing key-value store failed (connection, protocol, command)
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Stored data could not be interpreted
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Concurrent symbol → exchange → quote map shared by feeds and scanner.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Write price and timestamp of `update` as one atomic step.
    async fn upsert(&self, update: &PriceUpdate) -> StoreResult<()>;

    /// Point-in-time copy of every stored quote.
    async fn snapshot(&self) -> StoreResult<PriceSnapshot>;

    /// Backend name for logs ("memory", "redis")
    fn backend_name(&self) -> &'static str;
}

/// Type alias for the store handle held by every feed and the scanner
pub type SharedPriceStore = Arc<dyn PriceStore>;

/// In-process store backed by a `tokio::sync::RwLock`.
#[derive(Debug, Default)]
pub struct MemoryPriceStore {
    prices: RwLock<HashMap<String, HashMap<String, Quote>>>,
}

impl MemoryPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_shared(self) -> SharedPriceStore {
        Arc::new(self)
    }

    /// Number of symbols with at least one quote.
    pub async fn symbol_count(&self) -> usize {
        self.prices.read().await.len()
    }

    /// Total number of (symbol, exchange) quotes.
    pub async fn quote_count(&self) -> usize {
        self.prices.read().await.values().map(|m| m.len()).sum()
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn upsert(&self, update: &PriceUpdate) -> StoreResult<()> {
        let mut prices = self.prices.write().await;
        prices
            .entry(update.symbol().to_string())
            .or_default()
            .insert(update.exchange().to_string(), update.quote());
        tracing::trace!(
            symbol = update.symbol(),
            exchange = update.exchange(),
            price = update.price(),
            "Price updated"
        );
        Ok(())
    }

    async fn snapshot(&self) -> StoreResult<PriceSnapshot> {
        let prices = self.prices.read().await;
        Ok(prices
            .iter()
            .map(|(symbol, quotes)| {
                let quotes: ExchangeQuotes = quotes
                    .iter()
                    .map(|(exchange, quote)| (exchange.clone(), *quote))
                    .collect();
                (symbol.clone(), quotes)
            })
            .collect())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
