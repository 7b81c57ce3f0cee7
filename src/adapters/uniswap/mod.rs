//! Uniswap exchange feed module
//!
//! Polls pair prices from the Uniswap v2 subgraph over GraphQL.

pub mod adapter;
pub mod config;
pub mod types;

pub use adapter::UniswapFeed;
pub use config::{UniswapConfig, EXCHANGE_ID};
