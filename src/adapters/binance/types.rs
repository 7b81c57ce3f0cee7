//! Binance Types
//!
//! REST exchange-info payload, combined-stream ticker envelope, and the
//! helpers that split the symbol universe across connections.
//!
//! Combined stream frame:
//!   {"stream": "ethusdt@ticker", "data": {"e": "24hrTicker", "s": "ETHUSDT", "c": "3012.45", ...}}

use serde::Deserialize;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::core::types::PriceUpdate;

use super::config::EXCHANGE_ID;

// =============================================================================
// REST Types
// =============================================================================

/// `GET /api/v3/exchangeInfo` response (only the fields used)
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
}

impl ExchangeInfo {
    /// Symbol names in response order
    pub fn symbol_names(self) -> Vec<String> {
        self.symbols.into_iter().map(|s| s.symbol).collect()
    }
}

// =============================================================================
// WebSocket Message Types
// =============================================================================

/// Combined-stream envelope
#[derive(Debug, Clone, Deserialize)]
pub struct CombinedStreamMessage {
    #[serde(default)]
    pub stream: Option<String>,
    pub data: TickerData,
}

/// 24h rolling ticker payload (only the fields used)
#[derive(Debug, Clone, Deserialize)]
pub struct TickerData {
    /// Symbol, e.g. "ETHUSDT"
    #[serde(rename = "s")]
    pub symbol: String,
    /// Last price as string
    #[serde(rename = "c")]
    pub last_price: String,
}

impl TickerData {
    pub fn to_price_update(&self) -> ExchangeResult<PriceUpdate> {
        PriceUpdate::parse(EXCHANGE_ID, &self.symbol, &self.last_price)
    }
}

/// Parse one text frame into a price update
pub fn parse_ticker_message(text: &str) -> ExchangeResult<PriceUpdate> {
    let message: CombinedStreamMessage = serde_json::from_str(text)
        .map_err(|e| ExchangeError::InvalidResponse(format!("Invalid ticker frame: {}", e)))?;
    message.data.to_price_update()
}

// =============================================================================
// Stream partitioning
// =============================================================================

/// Split the universe into connection-sized batches, preserving order
///
/// A zero limit is treated as one stream per connection.
pub fn stream_batches(symbols: &[String], max_streams: usize) -> Vec<Vec<String>> {
    symbols
        .chunks(max_streams.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Stream name for a symbol's 24h ticker
pub fn ticker_stream_name(symbol: &str) -> String {
    format!("{}@ticker", symbol.to_lowercase())
}

/// `{ws_url}?streams=a@ticker/b@ticker/...`
pub fn build_stream_url(ws_url: &str, batch: &[String]) -> String {
    let streams: Vec<String> = batch.iter().map(|s| ticker_stream_name(s)).collect();
    format!("{}?streams={}", ws_url, streams.join("/"))
}
