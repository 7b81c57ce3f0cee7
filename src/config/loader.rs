//! Configuration loader for YAML files and environment overrides
//!
//! Precedence, lowest first: built-in defaults, the YAML file (optional),
//! then environment variables. The merged result is validated once.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use crate::error::AppError;

use super::types::{AppConfig, StoreBackend};

/// Load configuration from an optional YAML file plus environment
///
/// A missing file is not an error: defaults are used and a debug line is
/// logged. Environment overrides are applied before validation.
///
/// # Example
/// ```ignore
/// use std::path::Path;
/// use spread_watch::config::load_config;
///
/// let config = load_config(Path::new("config.yaml"))?;
/// ```
pub fn load_config(path: &Path) -> Result<AppConfig, AppError> {
    let mut config = if path.exists() {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        serde_yaml::from_reader(reader).map_err(|e| {
            AppError::Config(format!(
                "YAML parse error in '{}': {}",
                path.display(),
                e
            ))
        })?
    } else {
        tracing::debug!(path = %path.display(), "No configuration file, using defaults");
        AppConfig::default()
    };

    apply_env_overrides(&mut config)?;
    config.validate()?;

    Ok(config)
}

/// Load configuration from a YAML string (useful for testing)
///
/// Environment variables are not consulted.
pub fn load_config_from_str(yaml_content: &str) -> Result<AppConfig, AppError> {
    let config: AppConfig = serde_yaml::from_str(yaml_content)
        .map_err(|e| AppError::Config(format!("YAML parse error: {}", e)))?;

    config.validate()?;

    Ok(config)
}

/// Overwrite config fields from the process environment
///
/// Unset or empty variables leave the field untouched; a value that does not
/// parse is a configuration error.
pub fn apply_env_overrides(config: &mut AppConfig) -> Result<(), AppError> {
    if let Some(v) = env_string("BINANCE_API_URL") {
        config.binance.api_url = v;
    }
    if let Some(v) = env_string("BINANCE_WS_URL") {
        config.binance.ws_url = v;
    }
    if let Some(v) = env_string("UNISWAP_GRAPHQL_URL") {
        config.uniswap.graphql_url = v;
    }
    if let Some(v) = env_parse("ARBITRAGE_THRESHOLD")? {
        config.arbitrage.threshold_percent = v;
    }
    if let Some(v) = env_parse("DETECTION_INTERVAL")? {
        config.arbitrage.detection_interval_secs = v;
    }
    if let Some(v) = env_parse("UNISWAP_POLL_INTERVAL")? {
        config.uniswap.poll_interval_secs = v;
    }
    if let Some(v) = env_parse("HTTP_TIMEOUT")? {
        config.http.timeout_secs = v;
    }
    if let Some(v) = env_parse("MAX_CONCURRENT_CONNECTIONS")? {
        config.http.max_concurrent_connections = v;
    }
    if let Some(v) = env_string("REDIS_HOST") {
        config.redis.host = v;
    }
    if let Some(v) = env_parse("REDIS_PORT")? {
        config.redis.port = v;
    }
    if let Some(v) = env_parse("REDIS_DB")? {
        config.redis.db = v;
    }
    if let Some(v) = env_string("LOG_LEVEL") {
        config.log_level = v.to_lowercase();
    }
    if let Some(v) = env_string("PROXY_HOST") {
        config.proxy.host = Some(v);
    }
    if let Some(v) = env_parse("PROXY_PORT")? {
        config.proxy.port = Some(v);
    }
    if let Some(v) = env_string("PROXY_TYPE") {
        config.proxy.scheme = v.to_lowercase();
    }
    if let Some(v) = env_parse::<StoreBackend>("PRICE_STORE")? {
        config.store.backend = v;
    }

    Ok(())
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(name: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw.parse::<T>().map(Some).map_err(|e| {
            AppError::Config(format!("Invalid value for {}: '{}' ({})", name, raw, e))
        }),
        None => Ok(None),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_VARS: &[&str] = &[
        "BINANCE_API_URL",
        "BINANCE_WS_URL",
        "UNISWAP_GRAPHQL_URL",
        "ARBITRAGE_THRESHOLD",
        "DETECTION_INTERVAL",
        "UNISWAP_POLL_INTERVAL",
        "HTTP_TIMEOUT",
        "MAX_CONCURRENT_CONNECTIONS",
        "REDIS_HOST",
        "REDIS_PORT",
        "REDIS_DB",
        "LOG_LEVEL",
        "PROXY_HOST",
        "PROXY_PORT",
        "PROXY_TYPE",
        "PRICE_STORE",
    ];

    fn clear_env() {
        for name in ENV_VARS {
            std::env::remove_var(name);
        }
    }

    const VALID_CONFIG_YAML: &str = r#"
log_level: debug
binance:
  max_streams_per_connection: 200
uniswap:
  enabled: false
arbitrage:
  threshold_percent: 0.8
  detection_interval_secs: 2
redis:
  host: redis.local
"#;

    #[test]
    fn test_load_config_from_str_valid() {
        let config = load_config_from_str(VALID_CONFIG_YAML).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.binance.max_streams_per_connection, 200);
        assert!(!config.uniswap.enabled);
        assert_eq!(config.arbitrage.threshold_percent, 0.8);
        assert_eq!(config.redis.host, "redis.local");
        assert_eq!(config.redis.port, 6379);
    }

    #[test]
    fn test_load_config_from_str_invalid_yaml() {
        let result = load_config_from_str("invalid: yaml: content: [");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("YAML parse error"));
    }

    #[test]
    fn test_load_config_from_str_validation_failure() {
        let yaml = r#"
arbitrage:
  threshold_percent: -1.0
"#;
        let result = load_config_from_str(yaml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("threshold_percent"));
    }

    #[test]
    fn test_load_config_from_str_rejects_huge_backoff() {
        let err = load_config_from_str("retry:\n  backoff: 1.0e20\n").unwrap_err();
        assert!(err.to_string().contains("retry.backoff"));
    }

    #[test]
    #[serial(env)]
    fn test_env_uniswap_poll_interval_override() {
        clear_env();
        std::env::set_var("UNISWAP_POLL_INTERVAL", "3");

        let mut config = AppConfig::default();
        let result = apply_env_overrides(&mut config);
        clear_env();

        result.unwrap();
        assert_eq!(config.uniswap.poll_interval_secs, 3);
        assert_eq!(config.uniswap.poll_interval(), std::time::Duration::from_secs(3));
    }

    #[test]
    #[serial(env)]
    fn test_env_zero_poll_interval_is_validated() {
        clear_env();
        std::env::set_var("UNISWAP_POLL_INTERVAL", "0");

        let result = load_config(Path::new("/nonexistent/config.yaml"));
        clear_env();

        assert!(result.unwrap_err().to_string().contains("uniswap.poll_interval_secs"));
    }

    #[test]
    #[serial(env)]
    fn test_load_config_missing_file_uses_defaults() {
        clear_env();
        let config = load_config(Path::new("/nonexistent/path/config.yaml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    #[serial(env)]
    fn test_load_config_from_file_valid() {
        clear_env();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(VALID_CONFIG_YAML.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.binance.max_streams_per_connection, 200);
        assert!(!config.uniswap.enabled);
    }

    #[test]
    #[serial(env)]
    fn test_load_config_from_file_invalid_yaml() {
        clear_env();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"invalid: [yaml: content").unwrap();
        temp_file.flush().unwrap();

        let result = load_config(temp_file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("YAML parse error"));
    }

    #[test]
    #[serial(env)]
    fn test_env_overrides_file_values() {
        clear_env();
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(VALID_CONFIG_YAML.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        std::env::set_var("ARBITRAGE_THRESHOLD", "1.5");
        std::env::set_var("DETECTION_INTERVAL", "0.25");
        std::env::set_var("REDIS_HOST", "10.1.1.1");
        std::env::set_var("REDIS_PORT", "6390");
        std::env::set_var("REDIS_DB", "3");
        std::env::set_var("PROXY_HOST", "127.0.0.1");
        std::env::set_var("PROXY_PORT", "1080");
        std::env::set_var("PROXY_TYPE", "SOCKS5");
        std::env::set_var("PRICE_STORE", "redis");
        std::env::set_var("LOG_LEVEL", "WARN");

        let result = load_config(temp_file.path());
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.arbitrage.threshold_percent, 1.5);
        assert_eq!(config.arbitrage.detection_interval_secs, 0.25);
        assert_eq!(config.redis.url(), "redis://10.1.1.1:6390/3");
        assert_eq!(config.proxy.url().as_deref(), Some("socks5://127.0.0.1:1080"));
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    #[serial(env)]
    fn test_env_urls_override_defaults() {
        clear_env();
        std::env::set_var("BINANCE_API_URL", "http://127.0.0.1:1/info");
        std::env::set_var("BINANCE_WS_URL", "ws://127.0.0.1:2/stream");
        std::env::set_var("UNISWAP_GRAPHQL_URL", "http://127.0.0.1:3/graphql");

        let mut config = AppConfig::default();
        let result = apply_env_overrides(&mut config);
        clear_env();

        result.unwrap();
        assert_eq!(config.binance.api_url, "http://127.0.0.1:1/info");
        assert_eq!(config.binance.ws_url, "ws://127.0.0.1:2/stream");
        assert_eq!(config.uniswap.graphql_url, "http://127.0.0.1:3/graphql");
    }

    #[test]
    #[serial(env)]
    fn test_invalid_env_number_is_config_error() {
        clear_env();
        std::env::set_var("HTTP_TIMEOUT", "ten");

        let mut config = AppConfig::default();
        let result = apply_env_overrides(&mut config);
        clear_env();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("HTTP_TIMEOUT"));
    }

    #[test]
    #[serial(env)]
    fn test_empty_env_value_is_ignored() {
        clear_env();
        std::env::set_var("REDIS_HOST", "   ");

        let mut config = AppConfig::default();
        let result = apply_env_overrides(&mut config);
        clear_env();

        result.unwrap();
        assert_eq!(config.redis.host, "localhost");
    }

    #[test]
    #[serial(env)]
    fn test_env_threshold_is_validated() {
        clear_env();
        std::env::set_var("ARBITRAGE_THRESHOLD", "0");

        let result = load_config(Path::new("/nonexistent/config.yaml"));
        clear_env();

        assert!(result.is_err());
    }
}
