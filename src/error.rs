//! Application-wide error types using thiserror
//!
//! Layer errors (`ExchangeError`, `StoreError`) are wrapped in `AppError`
//! at the orchestration and configuration boundary.

use thiserror::Error;

use crate::adapters::errors::ExchangeError;
use crate::core::store::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
