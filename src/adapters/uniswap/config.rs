//! Uniswap Configuration
//!
//! Subgraph endpoint and paging parameters for the Uniswap v2 pair poller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Uniswap v2 subgraph
pub const DEFAULT_GRAPHQL_URL: &str =
    "https://api.thegraph.com/subgraphs/name/uniswap/uniswap-v2";

/// The Graph caps `first` at 1000
pub const MAX_PAGE_SIZE: usize = 1000;

/// Exchange id written into the price store
pub const EXCHANGE_ID: &str = "Uniswap";

/// Configuration for the Uniswap polling feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniswapConfig {
    /// Whether the feed is started by the orchestrator
    pub enabled: bool,
    /// GraphQL endpoint
    pub graphql_url: String,
    /// Records per page (`first`), also the `skip` increment
    pub batch_size: usize,
    /// Pause between two complete fetches
    pub poll_interval_secs: u64,
    /// Pause after a failed fetch-or-process cycle
    pub error_delay_secs: u64,
}

impl Default for UniswapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            batch_size: MAX_PAGE_SIZE,
            poll_interval_secs: 1,
            error_delay_secs: 5,
        }
    }
}

impl UniswapConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn error_delay(&self) -> Duration {
        Duration::from_secs(self.error_delay_secs)
    }
}
