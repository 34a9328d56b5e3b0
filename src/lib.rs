//! Newsreel: a periodic RSS ingester
//!
//! This crate pulls a configured list of RSS feeds on a timer, extracts news items
//! from each feed body, commits the new ones to SQLite in one batch per cycle, and
//! serves the most recent items over a small JSON API.

pub mod api;
pub mod config;
pub mod ingest;
pub mod report;
pub mod storage;

use thiserror::Error;

/// Main error type for Newsreel operations
#[derive(Debug, Error)]
pub enum NewsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Storage unavailable for {consecutive} consecutive cycles")]
    StorageUnavailable { consecutive: u32 },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid listen address: {0}")]
    InvalidAddress(String),
}

/// Result type alias for Newsreel operations
pub type Result<T> = std::result::Result<T, NewsError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use ingest::{extract_items, ItemRecord, Scheduler};
pub use report::ErrorReporter;
pub use storage::{DedupSink, SqliteStorage, Storage, StoredNewsItem};
