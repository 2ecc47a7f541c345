//! Removal of the client-side router and its hydration state.
//!
//! Without these scripts the page behaves as plain HTML: links navigate
//! instead of being intercepted by the bundled router.

use regex::Regex;

use super::replace_all;

#[derive(Debug)]
pub(super) struct ScriptRules {
    bundles: Regex,
    hydration: Regex,
}

impl ScriptRules {
    pub(super) fn new() -> Self {
        Self {
            // src ending in main.<hash>.js or containing "chunk", optional query string
            bundles: Regex::new(
                r#"(?i)<script\b[^>]*\bsrc\s*=\s*["'](?:(?:[^"']*/)?main\.[^"']*|[^"']*chunk[^"']*)\.js(?:\?[^"']*)?["'][^>]*>\s*</script>"#,
            )
            .expect("invalid bundle pattern"),
            hydration: Regex::new(r"(?s)<script(?:\s[^>]*)?>\s*window\.__REACT.*?</script>")
                .expect("invalid hydration pattern"),
        }
    }

    pub(super) fn strip_bundles(&self, markup: String) -> String {
        replace_all(&self.bundles, markup, "")
    }

    pub(super) fn strip_hydration(&self, markup: String) -> String {
        replace_all(&self.hydration, markup, "")
    }
}

#[cfg(test)]
mod tests {
    use super::super::{RewriteConfig, Rewriter, Rule, SiteProfile};

    fn apply(rule: Rule, markup: &str) -> String {
        let r = Rewriter::new(&SiteProfile::default()).unwrap();
        r.apply_rule(rule, markup, &RewriteConfig::new("/", "hero.page"))
    }

    #[test]
    fn test_strip_main_bundle() {
        let markup = r#"<p>a</p><script defer="defer" src="/static/js/main.8c3e1f.js"></script><p>b</p>"#;
        assert_eq!(apply(Rule::StripClientBundles, markup), "<p>a</p><p>b</p>");
    }

    #[test]
    fn test_strip_chunk_bundles() {
        let markup = concat!(
            r#"<script src="/static/js/787.2b1c.chunk.js"></script>"#,
            r#"<script src='/static/js/vendors~main.chunk.js?v=2'></script>"#,
            r#"<script src="/js/chunk-vendors.js"></script>"#,
        );
        assert_eq!(apply(Rule::StripClientBundles, markup), "");
    }

    #[test]
    fn test_keeps_unrelated_scripts() {
        let markup = concat!(
            r#"<script src="/static/js/analytics.js"></script>"#,
            r#"<script src="/static/js/domain.js"></script>"#,
            r#"<script>console.log("main.js")</script>"#,
        );
        assert_eq!(apply(Rule::StripClientBundles, markup), markup);
    }

    #[test]
    fn test_strip_hydration_spanning_lines() {
        let markup = "<body><script>window.__REACT_QUERY_STATE__ = {\n\"queries\": []\n};</script><p>x</p></body>";
        assert_eq!(apply(Rule::StripHydrationState, markup), "<body><p>x</p></body>");
    }

    #[test]
    fn test_strip_hydration_is_non_greedy() {
        let markup = "<script>window.__REACT_A__=1</script><p>keep</p><script>window.__REACT_B__=2</script>";
        assert_eq!(apply(Rule::StripHydrationState, markup), "<p>keep</p>");
    }

    #[test]
    fn test_hydration_keeps_other_inline_scripts() {
        let markup = "<script>window.dataLayer = [];</script>";
        assert_eq!(apply(Rule::StripHydrationState, markup), markup);
    }
}
