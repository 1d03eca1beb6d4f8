//! HTTP fetch layer for the crawler.
//!
//! ### Response classification
//! - `fetch_html` returns the body text of `text/html` responses only.
//! - Links without a usable scheme or host fail with `UnsupportedScheme`.
//! - Connection, TLS, timeout and body-read failures are `TransportFailure`.
//! - `fetch_asset` returns raw bytes plus status; callers judge the status.
//!
//! No caching happens here; that is the caller's job.

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, header};
use std::time::{Duration, Instant};

pub use self::url::{UrlError, has_netloc, is_duplicate, netloc, same_domain, strip_fragment, to_absolute};

/// Why a single fetch produced nothing usable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// Missing, invalid or non-web scheme, or no host.
    #[error("unsupported scheme: {url}")]
    UnsupportedScheme { url: String },

    /// Network, TLS or timeout failure.
    #[error("transport failure for {url}: {reason}")]
    TransportFailure { url: String, reason: String },

    /// The response is not declared as HTML.
    #[error("not HTML ({content_type}): {url}")]
    NotHtml { url: String, content_type: String },
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "sitecrawl/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "sitecrawl/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

impl From<&sitecrawl_core::AppConfig> for FetchConfig {
    fn from(config: &sitecrawl_core::AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// Raw response of an asset download.
#[derive(Debug, Clone)]
pub struct FetchedAsset {
    pub bytes: Bytes,
    pub status: StatusCode,
}

/// Network collaborator used by the crawl engine and the worker pool.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Fetch a page and return its HTML text.
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError>;

    /// Fetch any resource and return its bytes and status.
    async fn fetch_asset(&self, url: &str) -> Result<FetchedAsset, FetchError>;
}

/// Parse a target URL, rejecting anything that is not http(s) with a host.
fn parse_target(url: &str) -> Result<reqwest::Url, FetchError> {
    let unsupported = || FetchError::UnsupportedScheme { url: url.to_string() };
    let parsed = reqwest::Url::parse(url.trim()).map_err(|_| unsupported())?;
    match parsed.scheme() {
        "http" | "https" if parsed.has_host() => Ok(parsed),
        _ => Err(unsupported()),
    }
}

fn classify(url: &str, err: &reqwest::Error) -> FetchError {
    if err.is_builder() {
        FetchError::UnsupportedScheme { url: url.to_string() }
    } else {
        FetchError::TransportFailure { url: url.to_string(), reason: err.to_string() }
    }
}

/// reqwest-backed fetcher.
///
/// Cloning shares the underlying connection pool; build a new `Fetcher`
/// for an independent session.
#[derive(Debug, Clone)]
pub struct Fetcher {
    http: Client,
    config: FetchConfig,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, sitecrawl_core::Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| sitecrawl_core::Error::InvalidInput(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn get(&self, url: &str, accept: &str) -> Result<reqwest::Response, FetchError> {
        let target = parse_target(url)?;
        self.http
            .get(target)
            .header(header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| classify(url, &e))
    }
}

#[async_trait]
impl Fetch for Fetcher {
    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let start = Instant::now();
        let response = self
            .get(url, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .await?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !content_type.trim_start().to_ascii_lowercase().starts_with("text/html") {
            return Err(FetchError::NotHtml { url: url.to_string(), content_type });
        }

        let status = response.status();
        let text = response.text().await.map_err(|e| classify(url, &e))?;

        tracing::debug!(
            "fetched {} ({}) in {}ms ({} bytes)",
            url,
            status.as_u16(),
            start.elapsed().as_millis(),
            text.len()
        );

        Ok(text)
    }

    async fn fetch_asset(&self, url: &str) -> Result<FetchedAsset, FetchError> {
        let response = self.get(url, "*/*").await?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| classify(url, &e))?;

        tracing::debug!("fetched asset {} ({}, {} bytes)", url, status.as_u16(), bytes.len());

        Ok(FetchedAsset { bytes, status })
    }
}
