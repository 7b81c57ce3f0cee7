//! Feed adapter trait definition
//!
//! Every price source (streaming or polling) implements `FeedAdapter` so the
//! orchestrator can start and stop them uniformly.

use async_trait::async_trait;

use crate::adapters::errors::ExchangeResult;
use crate::adapters::types::FeedState;

/// Common trait for all price feeds
///
/// A feed owns its background tasks. `start` returns once the feed is
/// running (or failed to start); prices are written to the shared store from
/// background tasks until `stop`.
#[async_trait]
pub trait FeedAdapter: Send + Sync {
    /// Launch the feed's background work
    ///
    /// Calling `start` on a running feed is a no-op.
    async fn start(&mut self) -> ExchangeResult<()>;

    /// Signal shutdown, then abort and await every background task
    async fn stop(&mut self);

    /// Exchange id written into the price store (e.g. "Binance")
    fn exchange_name(&self) -> &'static str;

    fn is_running(&self) -> bool;

    /// Current lifecycle state
    async fn state(&self) -> FeedState;
}
