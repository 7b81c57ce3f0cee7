//! Uniswap Types
//!
//! GraphQL request/response shapes for the v2 subgraph `pairs` query.
//!
//! Pair record:
//!   { id, token0Price, token1Price, token0 { symbol }, token1 { symbol } }
//! `token0Price` is the price of token0 quoted in token1 (and vice versa).

use serde::{Deserialize, Serialize};

use crate::adapters::errors::{ExchangeError, ExchangeResult};
use crate::core::types::PriceUpdate;

use super::config::EXCHANGE_ID;

/// Paginated pairs query
pub const PAIRS_QUERY: &str = "query pairs($first: Int!, $skip: Int!) { \
    pairs(first: $first, skip: $skip) { \
        id token0Price token1Price token0 { symbol } token1 { symbol } \
    } \
}";

// =============================================================================
// Request
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct PairsVariables {
    pub first: usize,
    pub skip: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest {
    pub query: &'static str,
    pub variables: PairsVariables,
}

impl GraphQlRequest {
    pub fn pairs_page(first: usize, skip: usize) -> Self {
        Self {
            query: PAIRS_QUERY,
            variables: PairsVariables { first, skip },
        }
    }
}

// =============================================================================
// Response
// =============================================================================

/// Records stay as raw JSON so one malformed pair does not fail the page
#[derive(Debug, Clone, Deserialize)]
pub struct PairsData {
    pub pairs: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<PairsData>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

impl GraphQlResponse {
    /// Pairs of this page, or the GraphQL errors as `InvalidResponse`
    pub fn into_pairs(self) -> ExchangeResult<Vec<serde_json::Value>> {
        if let Some(errors) = self.errors.filter(|e| !e.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(ExchangeError::InvalidResponse(format!(
                "GraphQL errors: {}",
                messages.join("; ")
            )));
        }

        self.data
            .map(|d| d.pairs)
            .ok_or_else(|| ExchangeError::InvalidResponse("GraphQL response without data".into()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenRef {
    pub symbol: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairRecord {
    pub id: String,
    pub token0_price: String,
    pub token1_price: String,
    pub token0: TokenRef,
    pub token1: TokenRef,
}

impl PairRecord {
    /// `(token0.symbol, token0Price)` and `(token1.symbol, token1Price)`
    pub fn to_price_updates(&self) -> ExchangeResult<[PriceUpdate; 2]> {
        Ok([
            PriceUpdate::parse(EXCHANGE_ID, &self.token0.symbol, &self.token0_price)?,
            PriceUpdate::parse(EXCHANGE_ID, &self.token1.symbol, &self.token1_price)?,
        ])
    }
}

/// Best-effort id of a raw record, for logging
pub fn record_id(record: &serde_json::Value) -> &str {
    record.get("id").and_then(|v| v.as_str()).unwrap_or("<unknown>")
}

/// Decode one raw pair record into its two price updates
pub fn pair_updates(record: &serde_json::Value) -> ExchangeResult<[PriceUpdate; 2]> {
    let pair = PairRecord::deserialize(record).map_err(|e| {
        ExchangeError::InvalidResponse(format!("Invalid pair {}: {}", record_id(record), e))
    })?;
    pair.to_price_updates()
}
