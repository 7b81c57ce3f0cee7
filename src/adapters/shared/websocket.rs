//! Shared WebSocket connection helpers
//!
//! TLS-enabled WebSocket connection used by streaming feeds. Plain `ws://`
//! URLs (local test servers) connect without TLS.

use std::time::Duration;

use tokio_tungstenite::{
    connect_async_tls_with_config, Connector, MaybeTlsStream, WebSocketStream,
};

use crate::adapters::errors::ExchangeError;

/// Type alias for the WebSocket stream with TLS
pub type TlsWebSocketStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Connect to a WebSocket endpoint with TLS (TLSv1.2 minimum)
///
/// # Arguments
/// * `url` - WebSocket URL to connect to (wss:// or ws://)
/// * `timeout` - Bound on TCP connect, TLS and upgrade handshake together
///
/// # Returns
/// * `Ok(TlsWebSocketStream)` - Connected WebSocket stream
/// * `Err(ExchangeError)` - Connection or TLS error, `NetworkTimeout` on expiry
pub async fn connect_tls(url: &str, timeout: Duration) -> Result<TlsWebSocketStream, ExchangeError> {
    let tls = native_tls::TlsConnector::builder()
        .min_protocol_version(Some(native_tls::Protocol::Tlsv12))
        .build()
        .map_err(|e| ExchangeError::ConnectionFailed(format!("TLS error: {}", e)))?;

    let handshake = connect_async_tls_with_config(url, None, false, Some(Connector::NativeTls(tls)));
    let (ws_stream, _response) = tokio::time::timeout(timeout, handshake)
        .await
        .map_err(|_| ExchangeError::NetworkTimeout(timeout.as_millis() as u64))?
        .map_err(|e| ExchangeError::WebSocket(Box::new(e)))?;

    Ok(ws_stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_stalled_upgrade_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        // Accept TCP, never answer the HTTP upgrade
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let url = format!("ws://{}/stream", addr);
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            connect_tls(&url, Duration::from_millis(200)),
        )
        .await
        .expect("handshake must give up on its own");

        assert!(matches!(result, Err(ExchangeError::NetworkTimeout(200))));
    }

    #[tokio::test]
    async fn test_refused_connection_is_websocket_error() {
        let result = connect_tls("ws://127.0.0.1:1/stream", Duration::from_secs(5)).await;
        let err = result.unwrap_err();
        assert!(matches!(err, ExchangeError::WebSocket(_)));
        assert!(err.is_retryable());
    }
}
