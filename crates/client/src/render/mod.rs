//! Headless browser rendering against the live mirror host.
//!
//! The browser is optional: [`RenderSource`] is built once at startup and is
//! either backed by a [`Renderer`] or permanently unavailable. An unavailable
//! source fails fast so the orchestrator moves straight to the archive.
//!
//! ### Render Steps
//! 1. Navigate under a hard timeout using the configured wait condition
//! 2. Report `document.contentType`; non-HTML paths are not pages
//! 3. Wait (bounded, best effort) for CSS-in-JS style tags to populate
//! 4. Let the page settle for the post-load delay
//! 5. Flatten CSS-in-JS CSSOM rules into `<style id="inline-styles-from-cssom">`
//! 6. Serialize the DOM

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazarus_core::fetch::{STATUS_ADAPTER_FAILURE, STATUS_NOT_A_PAGE};
use lazarus_core::{AppConfig, FetchResult, RequestPath, WaitCondition};
use thiserror::Error;
use url::Url;

use crate::orchestrator::Source;

#[cfg(feature = "render")]
mod headless;

#[cfg(feature = "render")]
pub use headless::HeadlessRenderer;

/// Id of the style tag holding flattened CSSOM rules.
pub const CSSOM_STYLE_ID: &str = "inline-styles-from-cssom";

/// Errors that can occur during page rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// Failed to launch or connect to browser.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Failed to navigate to URL.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Failed to get page content.
    #[error("content retrieval failed: {0}")]
    ContentRetrieval(String),

    /// Navigation did not finish in time.
    #[error("render timeout after {0}ms")]
    Timeout(u64),
}

/// Options for rendering a page.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub wait_until: WaitCondition,

    /// Hard ceiling on navigation.
    pub timeout: Duration,

    /// Settle delay after navigation.
    pub post_wait: Duration,

    /// Upper bound on waiting for CSS-in-JS style tags; zero skips the wait.
    pub style_wait: Duration,

    /// Minimum serialized size for a result to count as a document.
    pub min_bytes: usize,

    /// Viewport dimensions (default: 1280x720).
    pub viewport: (u32, u32),
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for RenderOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            wait_until: config.render_wait_until,
            timeout: config.render_timeout(),
            post_wait: config.post_wait(),
            style_wait: config.style_wait(),
            min_bytes: config.render_min_bytes,
            viewport: (1280, 720),
        }
    }
}

/// Result of rendering a page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Serialized DOM after rendering.
    pub html: String,

    /// Final URL after redirects.
    pub final_url: Url,

    /// MIME type of the navigated document, when the browser reports one.
    pub content_type: Option<String>,

    /// Time taken to render in milliseconds.
    pub render_time_ms: u64,
}

/// Renderer trait for headless browser page rendering.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render a URL to HTML via headless browser.
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError>;
}

/// Whether a headless browser is usable in this process.
#[derive(Clone)]
pub enum RenderCapability {
    Available(Arc<dyn Renderer>),
    Unavailable,
}

impl std::fmt::Debug for RenderCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderCapability::Available(_) => f.write_str("Available"),
            RenderCapability::Unavailable => f.write_str("Unavailable"),
        }
    }
}

/// Render adapter: fetches paths by driving the renderer against the mirror host.
#[derive(Debug, Clone)]
pub struct RenderSource {
    capability: RenderCapability,
    mirror_host: String,
    opts: RenderOptions,
}

impl RenderSource {
    pub fn new(capability: RenderCapability, mirror_host: impl Into<String>, opts: RenderOptions) -> Self {
        Self { capability, mirror_host: mirror_host.into(), opts }
    }

    /// A source that always reports the adapter as unavailable.
    pub fn unavailable(config: &AppConfig) -> Self {
        Self::new(RenderCapability::Unavailable, config.mirror_host.clone(), RenderOptions::from(config))
    }

    /// Pick the render capability for this process.
    ///
    /// Unavailable when rendering is disabled by configuration, the crate was
    /// built without the `render` feature, or the browser fails to launch.
    pub async fn from_config(config: &AppConfig) -> Self {
        if !config.render_enabled {
            tracing::info!("headless rendering disabled by configuration");
            return Self::unavailable(config);
        }
        Self::launch(config).await
    }

    #[cfg(feature = "render")]
    async fn launch(config: &AppConfig) -> Self {
        let opts = RenderOptions::from(config);
        match HeadlessRenderer::launch(config.chrome_executable.as_deref(), &opts).await {
            Ok(renderer) => {
                tracing::info!("headless renderer ready");
                Self::new(RenderCapability::Available(Arc::new(renderer)), config.mirror_host.clone(), opts)
            }
            Err(e) => {
                tracing::warn!("headless renderer unavailable, archive only: {e}");
                Self::unavailable(config)
            }
        }
    }

    #[cfg(not(feature = "render"))]
    async fn launch(config: &AppConfig) -> Self {
        tracing::info!("built without the render feature, archive only");
        Self::unavailable(config)
    }

    pub fn is_available(&self) -> bool {
        matches!(self.capability, RenderCapability::Available(_))
    }

    /// Mirror URL for a path.
    pub fn page_url(&self, path: &RequestPath) -> Result<Url, url::ParseError> {
        Url::parse(&format!("https://{}{}", self.mirror_host, path))
    }

    fn classify(&self, page: RenderedPage) -> FetchResult {
        if let Some(ct) = page.content_type.as_deref()
            && !is_html_content_type(ct)
        {
            tracing::debug!(url = %page.final_url, content_type = ct, "render skipped non-html");
            return FetchResult::failure(STATUS_NOT_A_PAGE);
        }

        if !looks_like_document(&page.html, self.opts.min_bytes) {
            tracing::debug!(url = %page.final_url, bytes = page.html.len(), "rendered page is not a document");
            return FetchResult::failure(STATUS_NOT_A_PAGE);
        }

        tracing::debug!(
            url = %page.final_url,
            elapsed_ms = page.render_time_ms,
            bytes = page.html.len(),
            "rendered"
        );
        FetchResult::success(page.html)
    }
}

#[async_trait]
impl Source for RenderSource {
    fn name(&self) -> &'static str {
        "render"
    }

    async fn fetch(&self, path: &RequestPath) -> FetchResult {
        let RenderCapability::Available(renderer) = &self.capability else {
            return FetchResult::failure(STATUS_ADAPTER_FAILURE);
        };

        let url = match self.page_url(path) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!(%path, "cannot build mirror url: {e}");
                return FetchResult::failure(STATUS_ADAPTER_FAILURE);
            }
        };

        match renderer.render(&url, &self.opts).await {
            Ok(page) => self.classify(page),
            Err(e) => {
                tracing::warn!(%url, "render failed: {e}");
                FetchResult::failure(STATUS_ADAPTER_FAILURE)
            }
        }
    }
}

/// Whether a MIME type names an HTML document.
pub fn is_html_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence == "text/html" || essence == "application/xhtml+xml"
}

/// Whether serialized markup is a real document: longer than `min_bytes` and
/// starting with a doctype or `<html`.
pub fn looks_like_document(html: &str, min_bytes: usize) -> bool {
    if html.len() <= min_bytes {
        return false;
    }
    let head = html.trim_start();
    let prefix = head.get(..5).unwrap_or(head);
    head.starts_with("<!") || prefix.eq_ignore_ascii_case("<html")
}
