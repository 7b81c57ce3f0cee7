//! Binance Configuration
//!
//! Endpoints and connection limits for the Binance combined ticker streams.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// REST exchange-info endpoint (symbol universe)
pub const DEFAULT_API_URL: &str = "https://api.binance.com/api/v3/exchangeInfo";

/// Combined-stream WebSocket endpoint
pub const DEFAULT_WS_URL: &str = "wss://stream.binance.com:9443/stream";

/// Binance rejects combined connections with more than 1024 streams
pub const MAX_STREAMS_PER_CONNECTION: usize = 1024;

/// Exchange id written into the price store
pub const EXCHANGE_ID: &str = "Binance";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Binance streaming feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    /// Whether the feed is started by the orchestrator
    pub enabled: bool,
    /// Exchange-info URL
    pub api_url: String,
    /// Combined-stream base URL (`?streams=` is appended)
    pub ws_url: String,
    /// Streams multiplexed on one connection (1..=1024)
    pub max_streams_per_connection: usize,
    /// Fixed wait before reconnecting a dropped stream
    pub reconnect_delay_secs: u64,
    /// A connection silent for this long (no data, no ping) is dropped
    pub read_idle_timeout_secs: u64,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: DEFAULT_API_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            max_streams_per_connection: MAX_STREAMS_PER_CONNECTION,
            reconnect_delay_secs: 5,
            read_idle_timeout_secs: 300,
        }
    }
}

impl BinanceConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn read_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.read_idle_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = BinanceConfig::default();
        assert!(config.enabled);
        assert_eq!(config.api_url, "https://api.binance.com/api/v3/exchangeInfo");
        assert_eq!(config.ws_url, "wss://stream.binance.com:9443/stream");
        assert_eq!(config.max_streams_per_connection, 1024);
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
        assert_eq!(config.read_idle_timeout(), Duration::from_secs(300));
    }
}
