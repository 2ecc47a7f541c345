//! Canonical link replacement.

use regex::{Captures, Regex};

use super::{RewriteConfig, escape_html, replace_all};

#[derive(Debug)]
pub(super) struct CanonicalRules {
    existing: Regex,
    head_open: Regex,
}

impl CanonicalRules {
    pub(super) fn new() -> Self {
        Self {
            existing: Regex::new(r#"(?i)<link\b[^>]*\brel\s*=\s*["']?canonical\b["']?[^>]*>"#)
                .expect("invalid canonical pattern"),
            // `<head>` or `<head ...>`, never `<header>`
            head_open: Regex::new(r"(?i)<head(?:\s[^>]*)?>").expect("invalid head pattern"),
        }
    }

    /// Drop every canonical link, then add one right after the opening `<head>`.
    ///
    /// The new tag is inserted without surrounding whitespace so a second pass
    /// removes and re-adds it in place.
    pub(super) fn apply(&self, markup: String, cfg: &RewriteConfig) -> String {
        let markup = replace_all(&self.existing, markup, "");

        if !self.head_open.is_match(&markup) {
            return markup;
        }

        let tag = format!(r#"<link rel="canonical" href="{}" />"#, escape_html(&cfg.canonical_url()));
        self.head_open
            .replacen(&markup, 1, |caps: &Captures| format!("{}{tag}", &caps[0]))
            .into_owned()
    }
}
