//! HTTP Data Fetcher
//!
//! Single unauthenticated GET against a user-supplied URL, parsed as JSON.
//! No retries: a failed attempt is reported and the next scheduled refresh
//! is an independent attempt.

use crate::fetch::{FetchError, FetchResult};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Source of widget documents
///
/// Implemented by [`HttpFetcher`]; the refresh scheduler only depends on
/// this trait.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch and parse the document at `url`
    async fn fetch(&self, url: &str) -> FetchResult<Value>;
}

/// Configuration for the HTTP fetcher
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Overall request timeout; `None` leaves the transport default in place
    pub timeout: Option<Duration>,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            user_agent: format!("Finboard/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// reqwest-backed [`Fetch`] implementation
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Create a fetcher with the given configuration
    pub fn new(config: FetchConfig) -> FetchResult<Self> {
        let mut builder = Client::builder().user_agent(config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchResult<Value> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::debug!(url = %url, error = %e, "Request failed");
                FetchError::Transport(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = status.as_u16(), "Non-success status");
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let document: Value = serde_json::from_slice(&body)?;
        Ok(document)
    }
}
