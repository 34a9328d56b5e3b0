use crate::config::types::{
    ApiConfig, Config, FeedsConfig, FetcherConfig, StorageConfig, MAX_REQUEST_PERIOD_SECS,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_feeds(&config.feeds)?;
    validate_fetcher(&config.fetcher)?;
    validate_storage(&config.storage)?;
    validate_api(&config.api)?;
    Ok(())
}

/// Validates the feed list
fn validate_feeds(config: &FeedsConfig) -> Result<(), ConfigError> {
    if config.urls.is_empty() {
        return Err(ConfigError::Validation(
            "feeds.urls must list at least one feed".to_string(),
        ));
    }

    for feed in &config.urls {
        validate_feed_url(feed)?;
    }

    // Zero and negative periods fall back to the default; only the top is bounded
    if let Some(period) = config.request_period {
        if period > 0 && period as u64 > MAX_REQUEST_PERIOD_SECS {
            return Err(ConfigError::Validation(format!(
                "request-period must be at most {} seconds, got {}",
                MAX_REQUEST_PERIOD_SECS, period
            )));
        }
    }

    Ok(())
}

/// Validates a single feed URL: must parse and use HTTP(S)
fn validate_feed_url(feed: &str) -> Result<(), ConfigError> {
    let url = Url::parse(feed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid feed URL '{}': {}", feed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Feed URL '{}' must use http or https, got '{}'",
            feed,
            url.scheme()
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.timeout_secs < 1 || config.timeout_secs > 300 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be between 1 and 300, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates storage configuration
fn validate_storage(config: &StorageConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.connect_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "connect-retries must be >= 1, got {}",
            config.connect_retries
        )));
    }

    Ok(())
}

/// Validates read API configuration
fn validate_api(config: &ApiConfig) -> Result<(), ConfigError> {
    config
        .socket_addr()
        .map_err(|e| ConfigError::InvalidAddress(format!("'{}': {}", config.listen_address, e)))?;
    Ok(())
}
