//! Core module - price store, arbitrage scanner and runtime orchestration
//!
//! # Module Architecture
//!
//! This module uses **explicit re-exports** instead of glob exports (`pub use module::*`)
//! to provide better API visibility and prevent accidental public API changes.
//!
//! ## Usage
//! Prefer importing from `crate::core`:
//! ```ignore
//! use crate::core::{ArbitrageScanner, MemoryPriceStore, PriceUpdate};
//! ```

pub mod redis_store;
pub mod runtime;
pub mod scanner;
pub mod store;
pub mod types;

// Explicit re-exports for data types
pub use types::{ExchangeQuotes, OpportunityEvent, PriceSnapshot, PriceUpdate, Quote};

// Explicit re-exports for store modules
pub use redis_store::RedisPriceStore;
pub use store::{MemoryPriceStore, PriceStore, SharedPriceStore, StoreError, StoreResult};

// Explicit re-exports for scanner module
pub use scanner::{scan, ArbitrageScanner};

// Explicit re-exports for runtime module
pub use runtime::{build_store, Orchestrator};
