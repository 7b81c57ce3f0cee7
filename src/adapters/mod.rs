//! Price feed adapters
//!
//! This module provides the feed abstraction and the concrete feeds that
//! write exchange prices into the shared price store.

pub mod binance;
pub mod errors;
pub mod factory;
pub mod shared;
pub mod traits;
pub mod types;
pub mod uniswap;

// Re-export commonly used types for convenience
pub use binance::{BinanceConfig, BinanceFeed};
pub use errors::{ExchangeError, ExchangeResult};
pub use factory::{create_enabled_feeds, create_feed, AnyFeed, SUPPORTED_FEEDS};
pub use shared::RetryPolicy;
pub use traits::FeedAdapter;
pub use types::FeedState;
pub use uniswap::{UniswapConfig, UniswapFeed};
