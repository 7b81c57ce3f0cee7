//! Configuration module
//!
//! This module provides:
//! - Configuration types (`AppConfig` and its sections)
//! - YAML + environment loading (`load_config`)
//! - Logging configuration (`init_logging`)

mod loader;
pub mod logging;
mod types;

// Re-export types
pub use types::{
    AppConfig, ArbitrageConfig, HttpConfig, ProxyConfig, RedisConfig, RetryConfig,
    StoreBackend, StoreConfig,
};

// Re-export loader functions
pub use loader::{apply_env_overrides, load_config, load_config_from_str};

// Re-export logging functions
pub use logging::init_logging;
