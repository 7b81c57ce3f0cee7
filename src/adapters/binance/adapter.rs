//! Binance Feed Implementation
//!
//! Fetches the full symbol universe over REST, then streams 24h tickers for
//! every symbol over combined-stream WebSocket connections (at most
//! `max_streams_per_connection` streams each). Each connection runs its own
//! reconnect loop until the feed is stopped.
//!
//! Docs: https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::{build_http_client, classify_http_error, connect_tls, RetryPolicy};
use crate::adapters::traits::FeedAdapter;
use crate::adapters::types::{new_feed_state, transition, FeedState, SharedFeedState};
use crate::config::{HttpConfig, ProxyConfig};
use crate::core::store::SharedPriceStore;

use super::config::{BinanceConfig, EXCHANGE_ID};
use super::types::{build_stream_url, parse_ticker_message, stream_batches, ExchangeInfo};

// =============================================================================
// REST
// =============================================================================

/// One attempt at fetching the tradable symbol list
pub async fn fetch_symbols(
    client: &reqwest::Client,
    url: &str,
    timeout_secs: u64,
) -> ExchangeResult<Vec<String>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| classify_http_error(e, timeout_secs))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExchangeError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    let info: ExchangeInfo = response
        .json()
        .await
        .map_err(|e| classify_http_error(e, timeout_secs))?;

    Ok(info.symbol_names())
}

// =============================================================================
// Stream connection task
// =============================================================================

/// One spawned connection and its bookkeeping
struct StreamConnection {
    index: usize,
    stream_count: usize,
    state: SharedFeedState,
    handle: JoinHandle<()>,
}

/// Everything a connection task owns
struct StreamContext {
    index: usize,
    url: String,
    store: SharedPriceStore,
    running: Arc<AtomicBool>,
    reconnect_delay: Duration,
    connect_timeout: Duration,
    idle_timeout: Duration,
    state: SharedFeedState,
}

/// Connect, read until the stream ends, wait, reconnect; until shutdown
async fn run_stream_connection(ctx: StreamContext, mut shutdown_rx: broadcast::Receiver<()>) {
    tracing::info!(exchange = EXCHANGE_ID, connection = ctx.index, "Stream connection task started");

    while ctx.running.load(Ordering::SeqCst) {
        transition(&ctx.state, EXCHANGE_ID, FeedState::Connecting).await;

        let outcome = tokio::select! {
            _ = shutdown_rx.recv() => break,
            result = stream_once(&ctx) => result,
        };

        if !ctx.running.load(Ordering::SeqCst) {
            break;
        }

        match outcome {
            Ok(()) => tracing::warn!(
                exchange = EXCHANGE_ID,
                connection = ctx.index,
                "Stream closed by server"
            ),
            Err(e) => tracing::warn!(
                exchange = EXCHANGE_ID,
                connection = ctx.index,
                error = %e,
                "Stream connection failed"
            ),
        }

        transition(&ctx.state, EXCHANGE_ID, FeedState::Reconnecting).await;
        tracing::info!(
            exchange = EXCHANGE_ID,
            connection = ctx.index,
            delay_secs = ctx.reconnect_delay.as_secs_f64(),
            "Reconnecting stream"
        );

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep(ctx.reconnect_delay) => {}
        }
    }

    transition(&ctx.state, EXCHANGE_ID, FeedState::Stopped).await;
    tracing::info!(exchange = EXCHANGE_ID, connection = ctx.index, "Stream connection task ended");
}

/// A single connection lifetime: returns when the server closes the stream,
/// or with `NetworkTimeout` when the handshake or the stream stalls
async fn stream_once(ctx: &StreamContext) -> ExchangeResult<()> {
    let mut ws = connect_tls(&ctx.url, ctx.connect_timeout).await?;
    transition(&ctx.state, EXCHANGE_ID, FeedState::Streaming).await;
    tracing::info!(exchange = EXCHANGE_ID, connection = ctx.index, "Stream connected");

    loop {
        // Binance pings regularly, silence this long means a dead peer
        let msg_result = match tokio::time::timeout(ctx.idle_timeout, ws.next()).await {
            Ok(Some(msg_result)) => msg_result,
            Ok(None) => break,
            Err(_) => return Err(ExchangeError::NetworkTimeout(ctx.idle_timeout.as_millis() as u64)),
        };

        match msg_result? {
            Message::Text(text) => handle_text_frame(&text, ctx).await,
            Message::Binary(data) => match String::from_utf8(data) {
                Ok(text) => handle_text_frame(&text, ctx).await,
                Err(_) => tracing::warn!(
                    exchange = EXCHANGE_ID,
                    connection = ctx.index,
                    "Dropping non-UTF8 binary frame"
                ),
            },
            Message::Ping(payload) => {
                ws.send(Message::Pong(payload)).await?;
            }
            Message::Close(frame) => {
                tracing::info!(
                    exchange = EXCHANGE_ID,
                    connection = ctx.index,
                    frame = ?frame,
                    "Close frame received"
                );
                return Ok(());
            }
            Message::Pong(_) | Message::Frame(_) => {}
        }
    }

    Ok(())
}

async fn handle_text_frame(text: &str, ctx: &StreamContext) {
    match parse_ticker_message(text) {
        Ok(update) => {
            if let Err(e) = ctx.store.upsert(&update).await {
                tracing::error!(
                    exchange = EXCHANGE_ID,
                    symbol = %update.symbol(),
                    error = %e,
                    "Failed to store price"
                );
            } else {
                tracing::trace!(
                    exchange = EXCHANGE_ID,
                    symbol = %update.symbol(),
                    price = update.price(),
                    "Price updated"
                );
            }
        }
        Err(e) => {
            tracing::warn!(
                exchange = EXCHANGE_ID,
                connection = ctx.index,
                error = %e,
                "Dropping malformed ticker frame"
            );
        }
    }
}

// =============================================================================
// BinanceFeed
// =============================================================================

/// Streaming feed over Binance combined ticker streams
pub struct BinanceFeed {
    config: BinanceConfig,
    http_config: HttpConfig,
    proxy: ProxyConfig,
    retry: RetryPolicy,
    store: SharedPriceStore,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    state: SharedFeedState,
    connections: Vec<StreamConnection>,
    symbol_count: usize,
}

impl BinanceFeed {
    pub fn new(
        config: BinanceConfig,
        http_config: HttpConfig,
        proxy: ProxyConfig,
        retry: RetryPolicy,
        store: SharedPriceStore,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            http_config,
            proxy,
            retry,
            store,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            state: new_feed_state(),
            connections: Vec::new(),
            symbol_count: 0,
        }
    }

    /// Number of open connection tasks
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Streams handled per connection, in connection order
    pub fn streams_per_connection(&self) -> Vec<usize> {
        self.connections.iter().map(|c| c.stream_count).collect()
    }

    /// Size of the universe fetched at start
    pub fn symbol_count(&self) -> usize {
        self.symbol_count
    }

    /// Per-connection lifecycle states, in connection order
    pub async fn connection_states(&self) -> Vec<FeedState> {
        let mut states = Vec::with_capacity(self.connections.len());
        for conn in &self.connections {
            states.push(*conn.state.read().await);
        }
        states
    }

    fn spawn_connections(&mut self, symbols: &[String]) {
        let batches = stream_batches(symbols, self.config.max_streams_per_connection);

        for (index, batch) in batches.into_iter().enumerate() {
            let state = new_feed_state();
            let ctx = StreamContext {
                index,
                url: build_stream_url(&self.config.ws_url, &batch),
                store: Arc::clone(&self.store),
                running: Arc::clone(&self.running),
                reconnect_delay: self.config.reconnect_delay(),
                connect_timeout: Duration::from_secs(self.http_config.timeout_secs),
                idle_timeout: self.config.read_idle_timeout(),
                state: Arc::clone(&state),
            };

            tracing::debug!(
                exchange = EXCHANGE_ID,
                connection = index,
                streams = batch.len(),
                "Spawning stream connection"
            );

            let handle = tokio::spawn(run_stream_connection(ctx, self.shutdown_tx.subscribe()));
            self.connections.push(StreamConnection {
                index,
                stream_count: batch.len(),
                state,
                handle,
            });
        }
    }
}

#[async_trait]
impl FeedAdapter for BinanceFeed {
    async fn start(&mut self) -> ExchangeResult<()> {
        if self.is_running() {
            return Ok(());
        }

        let client = build_http_client(&self.http_config, &self.proxy)?;
        transition(&self.state, EXCHANGE_ID, FeedState::FetchingUniverse).await;

        let url = self.config.api_url.clone();
        let timeout_secs = self.http_config.timeout_secs;

        let symbols = match self
            .retry
            .run_default("binance.fetch_symbols", || fetch_symbols(&client, &url, timeout_secs))
            .await
        {
            Ok(symbols) => symbols,
            Err(e) => {
                tracing::error!(exchange = EXCHANGE_ID, error = %e, "Failed to fetch symbol universe");
                transition(&self.state, EXCHANGE_ID, FeedState::Stopped).await;
                return Err(e);
            }
        };

        tracing::info!(exchange = EXCHANGE_ID, symbols = symbols.len(), "Symbol universe fetched");

        if symbols.is_empty() {
            tracing::warn!(exchange = EXCHANGE_ID, "Empty symbol universe, no streams opened");
        }

        if self.proxy.is_enabled() && !symbols.is_empty() {
            tracing::warn!(
                exchange = EXCHANGE_ID,
                "Proxy applies to HTTP requests only, WebSocket streams connect directly"
            );
        }

        self.running.store(true, Ordering::SeqCst);
        self.symbol_count = symbols.len();
        self.spawn_connections(&symbols);

        transition(&self.state, EXCHANGE_ID, FeedState::Streaming).await;
        tracing::info!(
            exchange = EXCHANGE_ID,
            connections = self.connections.len(),
            "Binance feed started"
        );

        Ok(())
    }

    async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // No receivers left is fine
        let _ = self.shutdown_tx.send(());

        for conn in self.connections.drain(..) {
            conn.handle.abort();
            match conn.handle.await {
                Err(e) if e.is_panic() => tracing::error!(
                    exchange = EXCHANGE_ID,
                    connection = conn.index,
                    "Stream connection task panicked"
                ),
                _ => {}
            }
        }

        transition(&self.state, EXCHANGE_ID, FeedState::Stopped).await;
        tracing::info!(exchange = EXCHANGE_ID, "Binance feed stopped");
    }

    fn exchange_name(&self) -> &'static str {
        EXCHANGE_ID
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn state(&self) -> FeedState {
        *self.state.read().await
    }
}
