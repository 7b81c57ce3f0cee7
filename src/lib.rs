//! Spread Watch
//!
//! Cross-exchange price monitoring and arbitrage detection:
//! - Price feeds (Binance ticker streams, Uniswap v2 subgraph polling)
//! - Shared latest-price store (in-process or Redis)
//! - Periodic arbitrage scanner publishing opportunities

pub mod adapters;
pub mod config;
pub mod core;
pub mod error;

pub use error::AppError;
