//! Uniswap Feed Implementation
//!
//! Polls every pair of the Uniswap v2 subgraph page by page and writes both
//! token prices of each pair to the store. One full fetch per poll interval;
//! the fetch is retried as a whole under the feed's `RetryPolicy`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::adapters::shared::{build_http_client, classify_http_error, RetryPolicy};
use crate::adapters::traits::FeedAdapter;
use crate::adapters::types::{new_feed_state, transition, FeedState, SharedFeedState};
use crate::config::{HttpConfig, ProxyConfig};
use crate::core::store::SharedPriceStore;

use super::config::{UniswapConfig, EXCHANGE_ID};
use super::types::{pair_updates, record_id, GraphQlRequest, GraphQlResponse};

// =============================================================================
// GraphQL
// =============================================================================

/// Fetch one page of pairs
pub async fn fetch_page(
    client: &reqwest::Client,
    url: &str,
    first: usize,
    skip: usize,
    timeout_secs: u64,
) -> ExchangeResult<Vec<serde_json::Value>> {
    let response = client
        .post(url)
        .json(&GraphQlRequest::pairs_page(first, skip))
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

    let body: GraphQlResponse = response
        .json()
        .await
        .map_err(|e| classify_http_error(e, timeout_secs))?;

    body.into_pairs()
}

/// Fetch every pair, advancing `skip` by `batch_size` until an empty page
pub async fn fetch_all_pairs(
    client: &reqwest::Client,
    url: &str,
    batch_size: usize,
    timeout_secs: u64,
) -> ExchangeResult<Vec<serde_json::Value>> {
    let batch_size = batch_size.max(1);
    let mut all_pairs = Vec::new();
    let mut skip = 0;

    loop {
        let page = fetch_page(client, url, batch_size, skip, timeout_secs).await?;
        if page.is_empty() {
            break;
        }
        tracing::trace!(exchange = EXCHANGE_ID, skip, records = page.len(), "Fetched pairs page");
        all_pairs.extend(page);
        skip += batch_size;
    }

    Ok(all_pairs)
}

// =============================================================================
// Poll loop
// =============================================================================

/// Outcome of one successful poll cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub pairs: usize,
    pub updates: usize,
    pub skipped: usize,
}

struct PollContext {
    client: reqwest::Client,
    config: UniswapConfig,
    timeout_secs: u64,
    retry: RetryPolicy,
    store: SharedPriceStore,
    running: Arc<AtomicBool>,
}

/// Fetch all pairs (with retry) and write every valid price to the store
async fn poll_once(ctx: &PollContext) -> ExchangeResult<PollStats> {
    let records = ctx
        .retry
        .run_default("uniswap.fetch_pairs", || {
            fetch_all_pairs(
                &ctx.client,
                &ctx.config.graphql_url,
                ctx.config.batch_size,
                ctx.timeout_secs,
            )
        })
        .await?;

    let mut stats = PollStats {
        pairs: records.len(),
        ..PollStats::default()
    };

    for record in &records {
        match pair_updates(record) {
            Ok(updates) => {
                for update in &updates {
                    ctx.store.upsert(update).await?;
                }
                stats.updates += updates.len();
            }
            Err(e) => {
                tracing::warn!(
                    exchange = EXCHANGE_ID,
                    pair = record_id(record),
                    error = %e,
                    "Skipping pair"
                );
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

async fn run_poll_loop(ctx: PollContext, mut shutdown_rx: broadcast::Receiver<()>) {
    tracing::info!(exchange = EXCHANGE_ID, "Poll loop started");

    while ctx.running.load(Ordering::SeqCst) {
        let outcome = tokio::select! {
            _ = shutdown_rx.recv() => break,
            result = poll_once(&ctx) => result,
        };

        let pause = match outcome {
            Ok(stats) => {
                tracing::debug!(
                    exchange = EXCHANGE_ID,
                    pairs = stats.pairs,
                    updates = stats.updates,
                    skipped = stats.skipped,
                    "Poll cycle complete"
                );
                ctx.config.poll_interval()
            }
            Err(e) => {
                tracing::error!(exchange = EXCHANGE_ID, error = %e, "Poll cycle failed");
                ctx.config.error_delay()
            }
        };

        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tokio::time::sleep(pause) => {}
        }
    }

    tracing::info!(exchange = EXCHANGE_ID, "Poll loop ended");
}

// =============================================================================
// UniswapFeed
// =============================================================================

/// Polling feed over the Uniswap v2 subgraph
pub struct UniswapFeed {
    config: UniswapConfig,
    http_config: HttpConfig,
    proxy: ProxyConfig,
    retry: RetryPolicy,
    store: SharedPriceStore,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    state: SharedFeedState,
    poll_handle: Option<JoinHandle<()>>,
}

impl UniswapFeed {
    pub fn new(
        config: UniswapConfig,
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
            poll_handle: None,
        }
    }
}

#[async_trait]
impl FeedAdapter for UniswapFeed {
    async fn start(&mut self) -> ExchangeResult<()> {
        if self.is_running() {
            return Ok(());
        }

        let client = build_http_client(&self.http_config, &self.proxy)?;

        self.running.store(true, Ordering::SeqCst);
        let ctx = PollContext {
            client,
            config: self.config.clone(),
            timeout_secs: self.http_config.timeout_secs,
            retry: self.retry.clone(),
            store: Arc::clone(&self.store),
            running: Arc::clone(&self.running),
        };
        self.poll_handle = Some(tokio::spawn(run_poll_loop(ctx, self.shutdown_tx.subscribe())));

        transition(&self.state, EXCHANGE_ID, FeedState::Polling).await;
        tracing::info!(
            exchange = EXCHANGE_ID,
            batch_size = self.config.batch_size,
            interval_secs = self.config.poll_interval_secs,
            "Uniswap feed started"
        );

        Ok(())
    }

    async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        // No receivers left is fine
        let _ = self.shutdown_tx.send(());

        if let Some(handle) = self.poll_handle.take() {
            handle.abort();
            if let Err(e) = handle.await {
                if e.is_panic() {
                    tracing::error!(exchange = EXCHANGE_ID, "Poll task panicked");
                }
            }
        }

        transition(&self.state, EXCHANGE_ID, FeedState::Stopped).await;
        tracing::info!(exchange = EXCHANGE_ID, "Uniswap feed stopped");
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::core::store::{MemoryPriceStore, PriceStore};
    use mockito::Matcher;
    use serde_json::json;

    fn pair(index: usize) -> serde_json::Value {
        json!({
            "id": format!("0x{:040x}", index),
            "token0Price": "2.0",
            "token1Price": "0.5",
            "token0": {"symbol": format!("TKA{}", index)},
            "token1": {"symbol": format!("TKB{}", index)}
        })
    }

    fn page_body(pairs: Vec<serde_json::Value>) -> String {
        json!({"data": {"pairs": pairs}}).to_string()
    }

    fn test_config(url: String, batch_size: usize) -> UniswapConfig {
        UniswapConfig {
            graphql_url: url,
            batch_size,
            poll_interval_secs: 60,
            error_delay_secs: 60,
            ..UniswapConfig::default()
        }
    }

    #[tokio::test]
    async fn test_pagination_stops_on_empty_page() {
        let mut server = mockito::Server::new_async().await;
        let full_page = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"variables": {"first": 1000, "skip": 0}})))
            .with_status(200)
            .with_body(page_body((0..1000).map(pair).collect()))
            .expect(1)
            .create_async()
            .await;
        let empty_page = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"variables": {"skip": 1000}})))
            .with_status(200)
            .with_body(page_body(Vec::new()))
            .expect(1)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let pairs = fetch_all_pairs(&client, &server.url(), 1000, 10).await.unwrap();

        assert_eq!(pairs.len(), 1000);
        full_page.assert_async().await;
        empty_page.assert_async().await;
    }

    #[tokio::test]
    async fn test_partial_page_does_not_end_pagination() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"variables": {"skip": 0}})))
            .with_status(200)
            .with_body(page_body(vec![pair(0), pair(1)]))
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"variables": {"skip": 2}})))
            .with_status(200)
            .with_body(page_body(vec![pair(2)]))
            .expect(1)
            .create_async()
            .await;
        let third = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"variables": {"skip": 4}})))
            .with_status(200)
            .with_body(page_body(Vec::new()))
            .expect(1)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let pairs = fetch_all_pairs(&client, &server.url(), 2, 10).await.unwrap();

        assert_eq!(pairs.len(), 3);
        first.assert_async().await;
        second.assert_async().await;
        third.assert_async().await;
    }

    #[tokio::test]
    async fn test_graphql_errors_fail_the_fetch() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"errors":[{"message":"store error: timeout"}]}"#)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let err = fetch_all_pairs(&client, &server.url(), 1000, 10).await.unwrap_err();
        assert!(matches!(err, ExchangeError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_server_error_is_retryable_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(502)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let err = fetch_page(&client, &server.url(), 1000, 0, 10).await.unwrap_err();
        assert!(matches!(err, ExchangeError::HttpStatus { status: 502, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_poll_once_skips_malformed_records() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"variables": {"skip": 0}})))
            .with_status(200)
            .with_body(page_body(vec![pair(0), json!({"id": "0xbroken"}), pair(1)]))
            .create_async()
            .await;
        let _second = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"variables": {"skip": 1000}})))
            .with_status(200)
            .with_body(page_body(Vec::new()))
            .create_async()
            .await;

        let memory = Arc::new(MemoryPriceStore::new());
        let ctx = PollContext {
            client: reqwest::Client::new(),
            config: test_config(server.url(), 1000),
            timeout_secs: 10,
            retry: RetryPolicy::new(1, Duration::from_millis(1), 2.0),
            store: memory.clone(),
            running: Arc::new(AtomicBool::new(true)),
        };

        let stats = poll_once(&ctx).await.unwrap();
        assert_eq!(
            stats,
            PollStats {
                pairs: 3,
                updates: 4,
                skipped: 1
            }
        );

        let snapshot = memory.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot["TKA0"]["Uniswap"].price, 2.0);
        assert_eq!(snapshot["TKB1"]["Uniswap"].price, 0.5);
    }

    #[tokio::test]
    async fn test_feed_start_stop() {
        let mut server = mockito::Server::new_async().await;
        let _first = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"variables": {"skip": 0}})))
            .with_status(200)
            .with_body(page_body(vec![pair(7)]))
            .create_async()
            .await;
        let _second = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"variables": {"skip": 1000}})))
            .with_status(200)
            .with_body(page_body(Vec::new()))
            .create_async()
            .await;

        let memory = Arc::new(MemoryPriceStore::new());
        let mut feed = UniswapFeed::new(
            test_config(server.url(), 1000),
            HttpConfig::default(),
            ProxyConfig::default(),
            RetryPolicy::new(2, Duration::from_millis(1), 2.0),
            memory.clone(),
        );

        assert_eq!(feed.state().await, FeedState::Idle);
        feed.start().await.unwrap();
        assert!(feed.is_running());
        assert_eq!(feed.state().await, FeedState::Polling);

        for _ in 0..200 {
            if memory.quote_count().await == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(memory.quote_count().await, 2);

        feed.stop().await;
        assert!(!feed.is_running());
        assert_eq!(feed.state().await, FeedState::Stopped);
    }
}
