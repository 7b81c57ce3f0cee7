//! Shared helpers for feed adapters
//!
//! Retry policy, HTTP client construction and WebSocket connection
//! management used by every feed.

pub mod http;
pub mod retry;
pub mod websocket;

pub use http::{build_http_client, classify_http_error};
pub use retry::RetryPolicy;
pub use websocket::{connect_tls, TlsWebSocketStream};
