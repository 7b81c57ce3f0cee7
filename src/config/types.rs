//! Configuration types for the price monitor
//!
//! `AppConfig` is built once at startup (YAML file, then environment
//! overrides) and each component clones the section it needs.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::adapters::binance::BinanceConfig;
use crate::adapters::uniswap::UniswapConfig;
use crate::error::AppError;

/// Longest accepted pause between two scans
pub const MAX_DETECTION_INTERVAL_SECS: f64 = 3600.0;

/// Largest accepted retry delay multiplier
pub const MAX_RETRY_BACKOFF: f64 = 10.0;

/// Longest accepted first retry delay
pub const MAX_RETRY_INITIAL_DELAY_SECS: f64 = 3600.0;

// ============================================================================
// Enums
// ============================================================================

/// Price store backend
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// In-process map, lost on exit
    #[default]
    Memory,
    /// External Redis hashes, shared with other processes
    Redis,
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Redis => write!(f, "redis"),
        }
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => Err(AppError::Config(format!(
                "Unknown price store backend '{}' (expected memory or redis)",
                other
            ))),
        }
    }
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Arbitrage scanner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArbitrageConfig {
    /// Minimum spread to report, in percent (0.5 = 0.5%)
    pub threshold_percent: f64,
    /// Pause between two scans
    pub detection_interval_secs: f64,
    /// Pause after a failed snapshot
    pub error_delay_secs: u64,
    /// Capacity of the opportunity broadcast channel
    pub channel_capacity: usize,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            threshold_percent: 0.5,
            detection_interval_secs: 1.0,
            error_delay_secs: 5,
            channel_capacity: 256,
        }
    }
}

impl ArbitrageConfig {
    pub fn detection_interval(&self) -> Duration {
        let max = Duration::from_secs_f64(MAX_DETECTION_INTERVAL_SECS);
        Duration::try_from_secs_f64(self.detection_interval_secs).map_or(max, |d| d.min(max))
    }

    pub fn error_delay(&self) -> Duration {
        Duration::from_secs(self.error_delay_secs)
    }
}

/// Outbound HTTP client settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Idle connections kept per host
    pub max_concurrent_connections: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_concurrent_connections: 100,
        }
    }
}

/// Redis connection settings (used when `store.backend = redis`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    pub db: i64,
    /// Optional expiry applied to each `price:<symbol>` hash on write
    pub entry_ttl_secs: Option<u64>,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            entry_ttl_secs: None,
        }
    }
}

impl RedisConfig {
    /// Connection URL understood by the `redis` crate
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

/// Optional outbound proxy for HTTP clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// `http`, `https` or `socks5`
    pub scheme: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: None,
            scheme: "http".to_string(),
        }
    }
}

impl ProxyConfig {
    /// Proxy URL, only when both host and port are set
    pub fn url(&self) -> Option<String> {
        match (&self.host, self.port) {
            (Some(host), Some(port)) if !host.trim().is_empty() => {
                Some(format!("{}://{}:{}", self.scheme, host.trim(), port))
            }
            _ => None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.url().is_some()
    }
}

/// Retry policy applied to universe and page fetches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_secs: f64,
    pub backoff: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_secs: 5.0,
            backoff: 2.0,
        }
    }
}

/// Price store selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

/// Root application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default tracing filter when `RUST_LOG` is unset
    pub log_level: String,
    pub binance: BinanceConfig,
    pub uniswap: UniswapConfig,
    pub arbitrage: ArbitrageConfig,
    pub http: HttpConfig,
    pub redis: RedisConfig,
    pub proxy: ProxyConfig,
    pub retry: RetryConfig,
    pub store: StoreConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            binance: BinanceConfig::default(),
            uniswap: UniswapConfig::default(),
            arbitrage: ArbitrageConfig::default(),
            http: HttpConfig::default(),
            redis: RedisConfig::default(),
            proxy: ProxyConfig::default(),
            retry: RetryConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validate all configuration rules
    pub fn validate(&self) -> Result<(), AppError> {
        // Rule: at least one feed must run
        if !self.binance.enabled && !self.uniswap.enabled {
            return Err(AppError::Config(
                "At least one price feed must be enabled".to_string(),
            ));
        }

        // Rule: threshold strictly positive and finite
        let threshold = self.arbitrage.threshold_percent;
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(AppError::Config(format!(
                "arbitrage.threshold_percent must be a finite number > 0 (got {})",
                threshold
            )));
        }

        let interval = self.arbitrage.detection_interval_secs;
        if !interval.is_finite() || interval <= 0.0 || interval > MAX_DETECTION_INTERVAL_SECS {
            return Err(AppError::Config(format!(
                "arbitrage.detection_interval_secs must be in (0, {}] (got {})",
                MAX_DETECTION_INTERVAL_SECS, interval
            )));
        }

        if self.arbitrage.channel_capacity == 0 {
            return Err(AppError::Config(
                "arbitrage.channel_capacity must be >= 1".to_string(),
            ));
        }

        if self.uniswap.poll_interval_secs == 0 {
            return Err(AppError::Config(
                "uniswap.poll_interval_secs must be > 0".to_string(),
            ));
        }

        if self.uniswap.batch_size == 0 {
            return Err(AppError::Config(
                "uniswap.batch_size must be >= 1".to_string(),
            ));
        }

        let limit = self.binance.max_streams_per_connection;
        if limit == 0 || limit > crate::adapters::binance::MAX_STREAMS_PER_CONNECTION {
            return Err(AppError::Config(format!(
                "binance.max_streams_per_connection must be in 1..={} (got {})",
                crate::adapters::binance::MAX_STREAMS_PER_CONNECTION,
                limit
            )));
        }

        if self.binance.read_idle_timeout_secs == 0 {
            return Err(AppError::Config(
                "binance.read_idle_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.http.timeout_secs == 0 {
            return Err(AppError::Config("http.timeout_secs must be > 0".to_string()));
        }

        if self.retry.max_attempts == 0 {
            return Err(AppError::Config(
                "retry.max_attempts must be >= 1".to_string(),
            ));
        }

        let initial_delay = self.retry.initial_delay_secs;
        if !initial_delay.is_finite() || !(0.0..=MAX_RETRY_INITIAL_DELAY_SECS).contains(&initial_delay) {
            return Err(AppError::Config(format!(
                "retry.initial_delay_secs must be in [0, {}] (got {})",
                MAX_RETRY_INITIAL_DELAY_SECS, initial_delay
            )));
        }

        let backoff = self.retry.backoff;
        if !backoff.is_finite() || !(1.0..=MAX_RETRY_BACKOFF).contains(&backoff) {
            return Err(AppError::Config(format!(
                "retry.backoff must be in [1, {}] (got {})",
                MAX_RETRY_BACKOFF, backoff
            )));
        }

        // Rule: proxy scheme is one reqwest understands
        if !matches!(self.proxy.scheme.as_str(), "http" | "https" | "socks5") {
            return Err(AppError::Config(format!(
                "proxy.scheme must be http, https or socks5 (got '{}')",
                self.proxy.scheme
            )));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.arbitrage.threshold_percent, 0.5);
        assert_eq!(config.arbitrage.detection_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_threshold_fails() {
        let mut config = AppConfig::default();
        config.arbitrage.threshold_percent = 0.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("threshold_percent"));
    }

    #[test]
    fn test_nan_threshold_fails() {
        let mut config = AppConfig::default();
        config.arbitrage.threshold_percent = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_all_feeds_disabled_fails() {
        let mut config = AppConfig::default();
        config.binance.enabled = false;
        config.uniswap.enabled = false;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("At least one price feed"));
    }

    #[test]
    fn test_stream_limit_above_exchange_cap_fails() {
        let mut config = AppConfig::default();
        config.binance.max_streams_per_connection = 2000;
        assert!(config.validate().is_err());

        config.binance.max_streams_per_connection = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_read_idle_timeout_fails() {
        let mut config = AppConfig::default();
        config.binance.read_idle_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("read_idle_timeout_secs"));
    }

    #[test]
    fn test_zero_attempts_fails() {
        let mut config = AppConfig::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_backoff_below_one_fails() {
        let mut config = AppConfig::default();
        config.retry.backoff = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_backoff_fails() {
        let mut config = AppConfig::default();
        config.retry.backoff = 1.0e20;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("retry.backoff"));

        config.retry.backoff = MAX_RETRY_BACKOFF;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_huge_initial_delay_fails() {
        let mut config = AppConfig::default();
        config.retry.initial_delay_secs = 1.0e30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_huge_detection_interval_fails() {
        let mut config = AppConfig::default();
        config.arbitrage.detection_interval_secs = 1.0e30;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("detection_interval_secs"));
    }

    #[test]
    fn test_detection_interval_never_panics() {
        let mut arbitrage = ArbitrageConfig {
            detection_interval_secs: 1.0e30,
            ..ArbitrageConfig::default()
        };
        assert_eq!(arbitrage.detection_interval(), Duration::from_secs(3600));

        arbitrage.detection_interval_secs = f64::NAN;
        assert_eq!(arbitrage.detection_interval(), Duration::from_secs(3600));

        arbitrage.detection_interval_secs = 0.25;
        assert_eq!(arbitrage.detection_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_unknown_proxy_scheme_fails() {
        let mut config = AppConfig::default();
        config.proxy.scheme = "ftp".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("proxy.scheme"));
    }

    #[test]
    fn test_redis_url() {
        let redis = RedisConfig {
            host: "cache.internal".to_string(),
            port: 6380,
            db: 2,
            entry_ttl_secs: None,
        };
        assert_eq!(redis.url(), "redis://cache.internal:6380/2");
    }

    #[test]
    fn test_proxy_url_requires_host_and_port() {
        let mut proxy = ProxyConfig::default();
        assert_eq!(proxy.url(), None);

        proxy.host = Some("10.0.0.1".to_string());
        assert_eq!(proxy.url(), None);

        proxy.port = Some(1080);
        proxy.scheme = "socks5".to_string();
        assert_eq!(proxy.url().as_deref(), Some("socks5://10.0.0.1:1080"));
        assert!(proxy.is_enabled());
    }

    #[test]
    fn test_store_backend_from_str() {
        assert_eq!("redis".parse::<StoreBackend>().unwrap(), StoreBackend::Redis);
        assert_eq!(" Memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
arbitrage:
  threshold_percent: 1.25
store:
  backend: redis
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.arbitrage.threshold_percent, 1.25);
        assert_eq!(config.arbitrage.error_delay_secs, 5);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.redis.port, 6379);
        assert!(config.binance.enabled);
    }
}
