//! Feed factory for runtime feed selection
//!
//! Builds `FeedAdapter` instances from configuration.
//! Uses an enum-based dispatch pattern (no `Box<dyn>`) to preserve monomorphization.

use async_trait::async_trait;

use crate::adapters::binance::BinanceFeed;
use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::RetryPolicy;
use crate::adapters::traits::FeedAdapter;
use crate::adapters::types::FeedState;
use crate::adapters::uniswap::UniswapFeed;
use crate::config::AppConfig;
use crate::core::store::SharedPriceStore;

// =============================================================================
// AnyFeed - enum-based dispatch
// =============================================================================

/// Enum wrapping all concrete feed types for runtime dispatch.
pub enum AnyFeed {
    Binance(BinanceFeed),
    Uniswap(UniswapFeed),
}

/// Macro to reduce boilerplate for delegating trait methods
macro_rules! delegate {
    ($self:expr, $method:ident ( $($arg:expr),* )) => {
        match $self {
            AnyFeed::Binance(f) => f.$method($($arg),*),
            AnyFeed::Uniswap(f) => f.$method($($arg),*),
        }
    };
    (await $self:expr, $method:ident ( $($arg:expr),* )) => {
        match $self {
            AnyFeed::Binance(f) => f.$method($($arg),*).await,
            AnyFeed::Uniswap(f) => f.$method($($arg),*).await,
        }
    };
}

#[async_trait]
impl FeedAdapter for AnyFeed {
    async fn start(&mut self) -> ExchangeResult<()> {
        delegate!(await self, start())
    }

    async fn stop(&mut self) {
        delegate!(await self, stop())
    }

    fn exchange_name(&self) -> &'static str {
        delegate!(self, exchange_name())
    }

    fn is_running(&self) -> bool {
        delegate!(self, is_running())
    }

    async fn state(&self) -> FeedState {
        delegate!(await self, state())
    }
}

// =============================================================================
// Factory Functions
// =============================================================================

/// All supported feed names.
pub const SUPPORTED_FEEDS: &[&str] = &["binance", "uniswap"];

/// Create a feed from its name.
///
/// The feed is created but NOT started; call `start()` after.
pub fn create_feed(name: &str, config: &AppConfig, store: SharedPriceStore) -> ExchangeResult<AnyFeed> {
    let retry = RetryPolicy::from(&config.retry);

    match name {
        "binance" => Ok(AnyFeed::Binance(BinanceFeed::new(
            config.binance.clone(),
            config.http.clone(),
            config.proxy.clone(),
            retry,
            store,
        ))),
        "uniswap" => Ok(AnyFeed::Uniswap(UniswapFeed::new(
            config.uniswap.clone(),
            config.http.clone(),
            config.proxy.clone(),
            retry,
            store,
        ))),
        _ => Err(ExchangeError::Fatal(format!(
            "Unknown feed: '{}'. Supported: {}",
            name,
            SUPPORTED_FEEDS.join(", ")
        ))),
    }
}

/// Create every feed enabled in `config`, in `SUPPORTED_FEEDS` order.
pub fn create_enabled_feeds(config: &AppConfig, store: &SharedPriceStore) -> ExchangeResult<Vec<AnyFeed>> {
    let mut feeds = Vec::new();
    if config.binance.enabled {
        feeds.push(create_feed("binance", config, store.clone())?);
    }
    if config.uniswap.enabled {
        feeds.push(create_feed("uniswap", config, store.clone())?);
    }
    Ok(feeds)
}
