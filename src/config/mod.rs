//! Configuration module for Newsreel
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use newsreel::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("newsreel.toml")).unwrap();
//! println!("Polling {} feeds", config.feeds.urls.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, Config, FeedsConfig, FetcherConfig, StorageConfig, DEFAULT_REQUEST_PERIOD_SECS,
    MAX_REQUEST_PERIOD_SECS,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
