//! Feed adapter error types
//!
//! All feed-related errors are wrapped in the ExchangeError enum,
//! which implements thiserror for consistent error handling.
//! `is_retryable()` classifies them for `RetryPolicy`.

use thiserror::Error;

use crate::core::store::StoreError;

/// Error types for feed adapter operations
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// Connection to exchange failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Network operation timed out
    #[error("Network timeout after {0}ms")]
    NetworkTimeout(u64),

    /// Endpoint answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Transport-level HTTP failure (connect, read, decode)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket protocol error (boxed to reduce enum size)
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// Invalid or unexpected payload from exchange
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Price store rejected a write or read
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Unrecoverable condition (bad configuration, startup failure)
    #[error("Fatal: {0}")]
    Fatal(String),
}

impl ExchangeError {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Transport failures, timeouts, 5xx and 429 are transient. Malformed
    /// payloads, other 4xx, store and fatal errors are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            ExchangeError::ConnectionFailed(_)
            | ExchangeError::NetworkTimeout(_)
            | ExchangeError::WebSocket(_) => true,
            ExchangeError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            ExchangeError::Http(e) => !e.is_decode() && !e.is_builder(),
            ExchangeError::InvalidResponse(_)
            | ExchangeError::Store(_)
            | ExchangeError::Fatal(_) => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ExchangeError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        ExchangeError::WebSocket(Box::new(e))
    }
}

/// Result type alias for feed operations
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
