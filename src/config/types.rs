use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Tick interval used when `request-period` is absent or not positive
pub const DEFAULT_REQUEST_PERIOD_SECS: u64 = 60;

/// Longest accepted `request-period`: one year
pub const MAX_REQUEST_PERIOD_SECS: u64 = 365 * 24 * 60 * 60;

/// Main configuration structure for Newsreel
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Feed list and polling period
#[derive(Debug, Clone, Deserialize)]
pub struct FeedsConfig {
    /// Feed URLs, fetched in this order every cycle
    pub urls: Vec<String>,

    /// Seconds between cycles. Absent, zero or negative falls back to the default.
    #[serde(rename = "request-period", default)]
    pub request_period: Option<i64>,
}

impl FeedsConfig {
    /// Returns the effective tick interval
    pub fn interval(&self) -> Duration {
        match self.request_period {
            Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
            _ => Duration::from_secs(DEFAULT_REQUEST_PERIOD_SECS),
        }
    }
}

/// HTTP fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Per-fetch deadline in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every feed request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl FetcherConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// How many times opening the database is attempted before giving up
    #[serde(rename = "connect-retries", default = "default_connect_retries")]
    pub connect_retries: u32,

    /// Delay between open attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Consecutive failed cycle commits after which ingestion stops. 0 disables.
    #[serde(
        rename = "max-consecutive-failures",
        default = "default_max_consecutive_failures"
    )]
    pub max_consecutive_failures: u32,
}

impl StorageConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

/// Read API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Socket address the HTTP server binds to
    #[serde(rename = "listen-address", default = "default_listen_address")]
    pub listen_address: String,

    /// Directory with static front-end files served at `/`
    #[serde(rename = "webapp-dir", default)]
    pub webapp_dir: Option<PathBuf>,
}

impl ApiConfig {
    /// Parses the listen address. Validation guarantees this succeeds for loaded configs.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.listen_address.parse()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            webapp_dir: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("newsreel/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_retries() -> u32 {
    10
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_max_consecutive_failures() -> u32 {
    5
}

fn default_listen_address() -> String {
    "0.0.0.0:8000".to_string()
}
