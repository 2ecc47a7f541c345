//! Archive snapshot adapter.
//!
//! Fetches the origin's page from a fixed-timestamp snapshot endpoint. This is
//! the source of last resort: always reachable, sometimes stale, and serving
//! the un-rendered application shell for script-heavy pages.
//!
//! ### Status Mapping
//! - Transport status is passed through unchanged
//! - `200` with an empty body is the "empty" outcome
//! - Network, TLS and timeout errors, and bodies over `max_bytes`, become `500`

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lazarus_core::fetch::STATUS_ADAPTER_FAILURE;
use lazarus_core::{AppConfig, FetchResult, RequestPath};
use reqwest::{Client, StatusCode};

use crate::orchestrator::Source;

/// Errors raised while talking to the archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{len} bytes exceeds {max}")]
    TooLarge { len: usize, max: usize },
}

/// Configuration for the archive adapter.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Snapshot URL template with `{timestamp}` and `{url}` placeholders.
    pub url_template: String,
    pub timestamp: String,
    pub origin_host: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub max_bytes: usize,
    pub max_redirects: usize,
    pub accept_invalid_certs: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ArchiveConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            url_template: config.archive_url_template.clone(),
            timestamp: config.snapshot_timestamp.clone(),
            origin_host: config.origin_host.clone(),
            user_agent: config.user_agent.clone(),
            timeout: config.archive_timeout(),
            max_bytes: config.max_bytes,
            max_redirects: 5,
            accept_invalid_certs: config.accept_invalid_certs,
        }
    }
}

impl ArchiveConfig {
    /// Snapshot URL for the origin page at `path`.
    pub fn snapshot_url(&self, path: &RequestPath) -> String {
        let target = format!("https://{}{}", self.origin_host, path);
        self.url_template
            .replace("{timestamp}", &self.timestamp)
            .replace("{url}", &target)
    }
}

/// Archive adapter over a shared HTTP client.
#[derive(Debug, Clone)]
pub struct ArchiveSource {
    http: Client,
    config: ArchiveConfig,
}

impl ArchiveSource {
    /// Create a new archive source with the given configuration.
    pub fn new(config: ArchiveConfig) -> Result<Self, ArchiveError> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| ArchiveError::Client(e.to_string()))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    async fn get(&self, url: &str) -> Result<(StatusCode, Bytes), ArchiveError> {
        let start = Instant::now();
        let response = self
            .http
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await?;

        let status = response.status();
        let max = self.config.max_bytes;
        if let Some(len) = response.content_length()
            && len as usize > max
        {
            return Err(ArchiveError::TooLarge { len: len as usize, max });
        }

        let bytes = response.bytes().await?;
        if bytes.len() > max {
            return Err(ArchiveError::TooLarge { len: bytes.len(), max });
        }

        tracing::debug!(
            %url,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            bytes = bytes.len(),
            "archive response"
        );
        Ok((status, bytes))
    }
}

#[async_trait]
impl Source for ArchiveSource {
    fn name(&self) -> &'static str {
        "archive"
    }

    async fn fetch(&self, path: &RequestPath) -> FetchResult {
        let url = self.config.snapshot_url(path);

        match self.get(&url).await {
            Ok((status, _)) if status != StatusCode::OK => FetchResult::failure(status.as_u16()),
            Ok((_, body)) if body.is_empty() => FetchResult::empty(),
            Ok((_, body)) => FetchResult::success(String::from_utf8_lossy(&body)),
            Err(e) => {
                tracing::warn!(%url, "archive fetch failed: {e}");
                FetchResult::failure(STATUS_ADAPTER_FAILURE)
            }
        }
    }
}
