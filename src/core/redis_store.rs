//! Redis-backed price store
//!
//! Layout: one hash per symbol, key `price:<symbol>`, one field per exchange
//! holding its last price, plus a `timestamp` field (RFC 3339) for the most
//! recent write to that symbol.
//!
//! Writes go through a MULTI/EXEC pipeline so the price field and the
//! timestamp become visible together; reads use HGETALL, which is atomic per
//! key. Uses a `ConnectionManager` for automatic reconnection.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::config::RedisConfig;
use crate::core::store::{PriceStore, StoreResult};
use crate::core::types::{ExchangeQuotes, PriceSnapshot, PriceUpdate, Quote};

/// Key prefix for per-symbol hashes
pub const KEY_PREFIX: &str = "price";
/// Hash field holding the last write time of the symbol
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Price store living in an external Redis instance.
#[derive(Clone)]
pub struct RedisPriceStore {
    conn_manager: ConnectionManager,
    entry_ttl_secs: Option<u64>,
    redis_url: String,
}

impl fmt::Debug for RedisPriceStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisPriceStore")
            .field("redis_url", &self.redis_url)
            .field("entry_ttl_secs", &self.entry_ttl_secs)
            .field("conn_manager", &"<ConnectionManager>")
            .finish()
    }
}

impl RedisPriceStore {
    /// Connect to the instance described by `config`.
    pub async fn connect(config: &RedisConfig) -> StoreResult<Self> {
        let redis_url = config.url();
        tracing::info!(url = %redis_url, "Connecting to Redis price store");

        let client = redis::Client::open(redis_url.as_str())?;
        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            tracing::error!(url = %redis_url, error = %e, "Failed to create Redis ConnectionManager");
            e
        })?;

        tracing::info!(
            url = %redis_url,
            ttl_secs = ?config.entry_ttl_secs,
            "Redis price store ready"
        );

        Ok(Self {
            conn_manager,
            entry_ttl_secs: config.entry_ttl_secs,
            redis_url,
        })
    }
}

/// `price:<symbol>`
pub fn symbol_key(symbol: &str) -> String {
    format!("{}:{}", KEY_PREFIX, symbol)
}

/// Inverse of [`symbol_key`]; `None` for keys outside the prefix.
pub fn symbol_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(KEY_PREFIX)?.strip_prefix(':')
}

/// Decode one symbol hash into per-exchange quotes.
///
/// The symbol-level timestamp is attributed to every exchange. A missing or
/// unreadable timestamp maps to the Unix epoch so the quote reads as stale.
/// Fields whose value is not a positive number are skipped.
pub fn decode_symbol_hash(symbol: &str, fields: &HashMap<String, String>) -> ExchangeQuotes {
    let timestamp = fields
        .get(TIMESTAMP_FIELD)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

    fields
        .iter()
        .filter(|(field, _)| field.as_str() != TIMESTAMP_FIELD)
        .filter_map(|(exchange, raw)| match raw.parse::<f64>() {
            Ok(price) if price.is_finite() && price > 0.0 => {
                Some((exchange.clone(), Quote { price, timestamp }))
            }
            _ => {
                tracing::warn!(
                    symbol = symbol,
                    exchange = %exchange,
                    value = %raw,
                    "Skipping unreadable stored price"
                );
                None
            }
        })
        .collect()
}

#[async_trait]
impl PriceStore for RedisPriceStore {
    async fn upsert(&self, update: &PriceUpdate) -> StoreResult<()> {
        let key = symbol_key(update.symbol());
        let mut conn = self.conn_manager.clone();

        let mut pipe = redis::pipe();
        pipe.atomic()
            .hset(&key, update.exchange(), update.price())
            .ignore()
            .hset(&key, TIMESTAMP_FIELD, update.timestamp().to_rfc3339())
            .ignore();
        if let Some(ttl) = self.entry_ttl_secs {
            pipe.expire(&key, ttl as i64).ignore();
        }
        pipe.query_async::<_, ()>(&mut conn).await?;

        tracing::trace!(key = %key, exchange = update.exchange(), "Redis price updated");
        Ok(())
    }

    async fn snapshot(&self) -> StoreResult<PriceSnapshot> {
        let mut conn = self.conn_manager.clone();

        let mut keys: Vec<String> = Vec::new();
        {
            let pattern = format!("{}:*", KEY_PREFIX);
            let mut iter: redis::AsyncIter<String> = conn.scan_match(pattern).await?;
            while let Some(key) = iter.next_item().await {
                keys.push(key);
            }
        }
        // SCAN may return a key more than once
        keys.sort_unstable();
        keys.dedup();

        let mut snapshot = PriceSnapshot::new();
        for key in keys {
            let Some(symbol) = symbol_from_key(&key) else {
                continue;
            };
            let fields: HashMap<String, String> = conn.hgetall(&key).await?;
            let quotes = decode_symbol_hash(symbol, &fields);
            if !quotes.is_empty() {
                snapshot.insert(symbol.to_string(), quotes);
            }
        }

        Ok(snapshot)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
