//! Fetch collaborator
//!
//! This module defines the [`Fetcher`] seam the coordinator fetches through, and the default
//! HTTP implementation:
//! - Building HTTP clients with proper user agent strings
//! - Optional robots.txt checks, cached per origin
//! - Content-Type checks (only HTML is handed to the extractor)
//! - Error classification

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::robots::RobotsCache;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched document
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Content-Type header value
    pub content_type: String,
    /// Raw response body
    pub body: Vec<u8>,
}

/// Reasons a fetch produced no document
///
/// All variants are recoverable: the entry is dropped, counted and logged.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("disallowed by robots.txt")]
    RobotsDenied,

    #[error("unsupported content type '{0}'")]
    ContentMismatch(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Short label used for failure counters
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Timeout => "timeout",
            Self::Connect(_) => "connect",
            Self::RobotsDenied => "robots_denied",
            Self::ContentMismatch(_) => "content_mismatch",
            Self::Request(_) => "request",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Retrieves documents for the coordinator
///
/// Implementations own transport concerns: timeouts, redirects, politeness rules.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`, following redirects
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use sumi_harvest::config::UserAgentConfig;
/// use sumi_harvest::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "SumiHarvest".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Default [`Fetcher`] backed by `reqwest`
pub struct HttpFetcher {
    client: Client,
    robots: Option<RobotsCache>,
    agent_token: String,
}

impl HttpFetcher {
    /// Creates a fetcher from the run's user agent and crawler settings
    pub fn new(user_agent: &UserAgentConfig, crawler: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(user_agent)?;
        Ok(Self::with_client(
            client,
            &user_agent.crawler_name,
            crawler.respect_robots,
        ))
    }

    /// Creates a fetcher around an existing client
    pub fn with_client(client: Client, agent_token: &str, respect_robots: bool) -> Self {
        Self {
            client,
            robots: respect_robots.then(RobotsCache::new),
            agent_token: agent_token.to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, FetchError> {
        if let Some(robots) = &self.robots {
            let rules = robots.rules_for(&self.client, url).await;
            if !rules.is_allowed(url.as_str(), &self.agent_token) {
                return Err(FetchError::RobotsDenied);
            }
        }

        let response = self.client.get(url.as_str()).send().await?;
        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !is_html(&content_type) {
            return Err(FetchError::ContentMismatch(content_type));
        }

        let body = response.bytes().await?;

        Ok(FetchedDocument {
            final_url,
            status: status.as_u16(),
            content_type,
            body: body.to_vec(),
        })
    }
}

/// Checks whether a Content-Type names an HTML document
fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}
