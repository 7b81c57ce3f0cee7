//! Shared HTTP client construction
//!
//! Every REST/GraphQL call goes through a `reqwest::Client` built here, with
//! the configured timeout, idle pool size and optional outbound proxy.

use std::time::Duration;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::config::{HttpConfig, ProxyConfig};

/// Build an HTTP client for one feed.
pub fn build_http_client(http: &HttpConfig, proxy: &ProxyConfig) -> ExchangeResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(Duration::from_secs(http.timeout_secs))
        .pool_max_idle_per_host(http.max_concurrent_connections);

    if let Some(proxy_url) = proxy.url() {
        let proxy = reqwest::Proxy::all(&proxy_url).map_err(|e| {
            ExchangeError::Fatal(format!("invalid proxy '{}': {}", proxy_url, e))
        })?;
        tracing::info!(proxy = %proxy_url, "Routing HTTP traffic through proxy");
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ExchangeError::Fatal(format!("failed to build HTTP client: {}", e)))
}

/// Map a reqwest failure onto the feed error taxonomy.
pub fn classify_http_error(e: reqwest::Error, timeout_secs: u64) -> ExchangeError {
    if e.is_timeout() {
        ExchangeError::NetworkTimeout(timeout_secs * 1000)
    } else if e.is_connect() {
        ExchangeError::ConnectionFailed(e.to_string())
    } else if e.is_decode() {
        ExchangeError::InvalidResponse(e.to_string())
    } else {
        ExchangeError::Http(e)
    }
}
