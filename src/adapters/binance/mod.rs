//! Binance exchange feed module
//!
//! Streams 24h ticker prices for the whole Binance spot universe over
//! combined-stream WebSocket connections.

pub mod adapter;
pub mod config;
pub mod types;

pub use adapter::BinanceFeed;
pub use config::{BinanceConfig, EXCHANGE_ID, MAX_STREAMS_PER_CONNECTION};
