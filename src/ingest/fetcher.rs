//! HTTP fetcher implementation
//!
//! This module performs the single GET request made per feed per cycle:
//! - Building the HTTP client with the configured user agent
//! - Enforcing the caller's deadline over the request and the body read
//! - Classifying failures into [`FetchError`] values

use crate::config::FetcherConfig;
use reqwest::{redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};

/// Why a single feed could not be fetched
///
/// These are values returned to the scheduler, never cycle-aborting faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Failed to read body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("Feed task for {url} did not complete: {message}")]
    Aborted { url: String, message: String },
}

impl FetchError {
    /// The feed URL this error belongs to
    pub fn url(&self) -> &str {
        match self {
            Self::Network { url, .. }
            | Self::Status { url, .. }
            | Self::Timeout { url, .. }
            | Self::Body { url, .. }
            | Self::Aborted { url, .. } => url,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use newsreel::config::FetcherConfig;
/// use newsreel::ingest::build_http_client;
///
/// let client = build_http_client(&FetcherConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.timeout())
        .connect_timeout(Duration::from_secs(10).min(config.timeout()))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches raw feed bodies
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches one feed body
    ///
    /// # Request Flow
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx and body read | `Ok(body)` |
    /// | Non-2xx status | `FetchError::Status` |
    /// | Deadline passed (request or body) | `FetchError::Timeout` |
    /// | Connect/DNS/TLS failure | `FetchError::Network` |
    /// | Body read failure | `FetchError::Body` |
    ///
    /// # Arguments
    ///
    /// * `url` - The feed URL
    /// * `deadline` - Upper bound for the whole exchange
    pub async fn fetch(&self, url: &str, deadline: Duration) -> Result<String, FetchError> {
        let expires = Instant::now() + deadline;
        let timed_out = || FetchError::Timeout {
            url: url.to_string(),
            timeout: deadline,
        };

        let response = match timeout_at(expires, self.client.get(url).send()).await {
            Err(_) => return Err(timed_out()),
            Ok(Err(e)) if e.is_timeout() => return Err(timed_out()),
            Ok(Err(e)) => {
                let message = if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    e.to_string()
                };
                return Err(FetchError::Network {
                    url: url.to_string(),
                    message,
                });
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        match timeout_at(expires, response.text()).await {
            Err(_) => Err(timed_out()),
            Ok(Err(e)) if e.is_timeout() => Err(timed_out()),
            Ok(Err(e)) => Err(FetchError::Body {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Ok(Ok(body)) => Ok(body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> Fetcher {
        Fetcher::new(&FetcherConfig::default()).unwrap()
    }

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&FetcherConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_success_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss/>"))
            .mount(&server)
            .await;

        let body = fetcher()
            .fetch(&format!("{}/rss", server.uri()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(body, "<rss/>");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = format!("{}/rss", server.uri());
        let err = fetcher()
            .fetch(&url, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err, FetchError::Status { url, status: 503 });
    }

    #[tokio::test]
    async fn test_fetch_deadline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<rss/>")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch(&format!("{}/rss", server.uri()), Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout { .. }), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        // Bind then drop a listener to get a port nothing listens on
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let url = format!("http://127.0.0.1:{}/rss", port);
        let err = fetcher()
            .fetch(&url, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Network { .. }), "got {:?}", err);
        assert_eq!(err.url(), url);
    }
}
