//! Headless Chrome/Chromium renderer using chromiumoxide.

use std::path::Path;
use std::time::{Duration, Instant};

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use lazarus_core::WaitCondition;
use tokio::task::JoinHandle;
use url::Url;

use super::{CSSOM_STYLE_ID, RenderError, RenderOptions, RenderedPage, Renderer};

const STYLE_POLL: Duration = Duration::from_millis(100);
const IDLE_POLL: Duration = Duration::from_millis(500);

const STYLES_POPULATED_JS: &str = r#"Array.from(document.querySelectorAll('style[data-styled], style[data-emotion]'))
    .some((s) => s.textContent && s.textContent.trim().length > 0)"#;

const RESOURCE_COUNT_JS: &str = "performance.getEntriesByType('resource').length";

fn flatten_cssom_js() -> String {
    format!(
        r#"(() => {{
    const rules = [];
    for (const sheet of Array.from(document.styleSheets)) {{
        const owner = sheet.ownerNode;
        if (!owner || !owner.hasAttribute) continue;
        if (!owner.hasAttribute('data-styled') && !owner.hasAttribute('data-emotion')) continue;
        try {{
            for (const rule of Array.from(sheet.cssRules)) rules.push(rule.cssText);
        }} catch (e) {{}}
    }}
    if (rules.length === 0 || !document.head) return 0;
    let style = document.getElementById('{CSSOM_STYLE_ID}');
    if (!style) {{
        style = document.createElement('style');
        style.id = '{CSSOM_STYLE_ID}';
        document.head.appendChild(style);
    }}
    style.textContent = rules.join('\n');
    return rules.length;
}})()"#
    )
}

/// Headless browser shared by all requests; each render opens and closes its own tab.
pub struct HeadlessRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl HeadlessRenderer {
    /// Launch a headless browser instance.
    ///
    /// The browser uses a background task to handle Chrome DevTools Protocol
    /// events for as long as it lives.
    pub async fn launch(executable: Option<&Path>, opts: &RenderOptions) -> Result<Self, RenderError> {
        let mut builder = BrowserConfig::builder()
            .window_size(opts.viewport.0, opts.viewport.1)
            .request_timeout(opts.timeout)
            .arg("--disable-crash-reporter")
            .arg("--no-crashpad");
        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }

        let (browser, mut handler) = Browser::launch(builder.build().map_err(RenderError::BrowserLaunch)?)
            .await
            .map_err(|e| RenderError::BrowserLaunch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        Ok(Self { browser, handler })
    }

    /// Close the browser and stop its event task.
    pub async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("browser close failed: {e}");
        }
        self.handler.abort();
    }

    async fn navigate(page: &Page, url: &Url, opts: &RenderOptions) -> Result<(), RenderError> {
        let deadline = Instant::now() + opts.timeout;
        let timeout_ms = opts.timeout.as_millis() as u64;

        tokio::time::timeout(opts.timeout, page.goto(url.as_str()))
            .await
            .map_err(|_| RenderError::Timeout(timeout_ms))?
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        if opts.wait_until == WaitCondition::NetworkIdle {
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::timeout(remaining, Self::wait_network_idle(page))
                .await
                .map_err(|_| RenderError::Timeout(timeout_ms))?;
        }
        Ok(())
    }

    /// Poll until the resource-timing count stops changing.
    async fn wait_network_idle(page: &Page) {
        let mut last = None;
        loop {
            let count = page
                .evaluate(RESOURCE_COUNT_JS)
                .await
                .ok()
                .and_then(|v| v.into_value::<u64>().ok());
            if count.is_some() && count == last {
                return;
            }
            last = count;
            tokio::time::sleep(IDLE_POLL).await;
        }
    }

    async fn wait_for_styles(page: &Page, bound: Duration) {
        if bound.is_zero() {
            return;
        }
        let poll = async {
            loop {
                let ready = page
                    .evaluate(STYLES_POPULATED_JS)
                    .await
                    .ok()
                    .and_then(|v| v.into_value::<bool>().ok())
                    .unwrap_or(false);
                if ready {
                    return;
                }
                tokio::time::sleep(STYLE_POLL).await;
            }
        };
        if tokio::time::timeout(bound, poll).await.is_err() {
            tracing::debug!("css-in-js styles not populated after {}ms", bound.as_millis());
        }
    }

    async fn render_page(page: &Page, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError> {
        let start = Instant::now();
        Self::navigate(page, url, opts).await?;

        let content_type = page
            .evaluate("document.contentType")
            .await
            .ok()
            .and_then(|v| v.into_value::<String>().ok());

        Self::wait_for_styles(page, opts.style_wait).await;

        if !opts.post_wait.is_zero() {
            tokio::time::sleep(opts.post_wait).await;
        }

        if let Err(e) = page.evaluate(flatten_cssom_js()).await {
            tracing::debug!("cssom flattening failed for {url}: {e}");
        }

        let html = page
            .content()
            .await
            .map_err(|e| RenderError::ContentRetrieval(e.to_string()))?;

        let final_url = page
            .url()
            .await
            .ok()
            .flatten()
            .and_then(|u| Url::parse(&u).ok())
            .unwrap_or_else(|| url.clone());

        Ok(RenderedPage { html, final_url, content_type, render_time_ms: start.elapsed().as_millis() as u64 })
    }
}

#[async_trait::async_trait]
impl Renderer for HeadlessRenderer {
    async fn render(&self, url: &Url, opts: &RenderOptions) -> Result<RenderedPage, RenderError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| RenderError::Navigation(e.to_string()))?;

        let result = Self::render_page(&page, url, opts).await;

        if let Err(e) = page.close().await {
            tracing::debug!("page close failed: {e}");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_script_targets_style_id() {
        let js = flatten_cssom_js();
        assert!(js.contains("document.getElementById('inline-styles-from-cssom')"));
        assert!(js.contains("data-emotion"));
        assert!(js.contains("document.head.appendChild(style)"));
    }

    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_headless_renderer_launch() {
        let renderer = HeadlessRenderer::launch(None, &RenderOptions::default()).await;
        assert!(renderer.is_ok());
        renderer.unwrap().close().await;
    }

    #[tokio::test]
    #[ignore = "requires network and Chrome/Chromium"]
    async fn test_render_simple_page() {
        let renderer = HeadlessRenderer::launch(None, &RenderOptions::default()).await.unwrap();
        let url = Url::parse("https://example.com").unwrap();

        let page = renderer.render(&url, &RenderOptions::default()).await.unwrap();
        assert!(page.html.contains("<html"));
        assert_eq!(page.content_type.as_deref(), Some("text/html"));
        renderer.close().await;
    }
}
