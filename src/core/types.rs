//! Core data types for the ingestion and detection pipeline.
//!
//! Feeds produce `PriceUpdate`s, the store keeps one `Quote` per
//! (symbol, exchange) and hands out `PriceSnapshot`s, and the scanner
//! turns snapshots into `OpportunityEvent`s.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::adapters::errors::{ExchangeError, ExchangeResult};

// =============================================================================
// Price Update (one quote from one exchange)
// =============================================================================

/// A single quote produced by a feed adapter.
///
/// Only constructed through [`PriceUpdate::new`] / [`PriceUpdate::parse`],
/// which guarantee a non-empty symbol and a finite, positive price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceUpdate {
    exchange: String,
    symbol: String,
    price: f64,
    timestamp: DateTime<Utc>,
}

impl PriceUpdate {
    pub fn new(
        exchange: impl Into<String>,
        symbol: impl Into<String>,
        price: f64,
        timestamp: DateTime<Utc>,
    ) -> ExchangeResult<Self> {
        let symbol = symbol.into();
        if symbol.trim().is_empty() {
            return Err(ExchangeError::InvalidResponse("empty symbol".into()));
        }
        if !price.is_finite() || price <= 0.0 {
            return Err(ExchangeError::InvalidResponse(format!(
                "price for {} must be finite and > 0 (got {})",
                symbol, price
            )));
        }

        Ok(Self {
            exchange: exchange.into(),
            symbol,
            price,
            timestamp,
        })
    }

    /// Build an update from a numeric string as sent by the exchanges,
    /// stamped with the current time.
    pub fn parse(exchange: &str, symbol: &str, raw_price: &str) -> ExchangeResult<Self> {
        let price = raw_price.trim().parse::<f64>().map_err(|e| {
            ExchangeError::InvalidResponse(format!(
                "invalid price '{}' for {}: {}",
                raw_price, symbol, e
            ))
        })?;
        Self::new(exchange, symbol, price, Utc::now())
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn quote(&self) -> Quote {
        Quote {
            price: self.price,
            timestamp: self.timestamp,
        }
    }
}

// =============================================================================
// Store cells and snapshots
// =============================================================================

/// Latest price of one symbol on one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

/// exchange → latest quote, ordered by exchange id.
pub type ExchangeQuotes = BTreeMap<String, Quote>;

/// symbol → exchange → latest quote.
///
/// Ordered maps keep scan output and tie-breaks independent of hashing.
pub type PriceSnapshot = BTreeMap<String, ExchangeQuotes>;

// =============================================================================
// Arbitrage Opportunity
// =============================================================================

/// Cross-exchange price discrepancy at or above the configured threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityEvent {
    pub symbol: String,
    /// Exchange quoting the lowest price (buy here)
    pub buy_exchange: String,
    pub buy_price: f64,
    /// Exchange quoting the highest price (sell here)
    pub sell_exchange: String,
    pub sell_price: f64,
    /// (sell - buy) / buy * 100
    pub spread_percent: f64,
    pub detected_at: DateTime<Utc>,
}
