//! Style rules that keep links clickable once the client router is gone.

use regex::Regex;

use super::replace_all;

/// Id of the injected style block; its presence marks the rule as applied.
pub(super) const CLICKABLE_STYLE_ID: &str = "mirror-clickable-links";

#[derive(Debug)]
pub(super) struct StyleRules {
    pointer_none: Regex,
    head_close: Regex,
    clickable_block: String,
}

impl StyleRules {
    pub(super) fn new() -> Self {
        Self {
            pointer_none: Regex::new(r"pointer-events:(\s*)none").expect("invalid pointer-events pattern"),
            head_close: Regex::new(r"(?i)</head\s*>").expect("invalid head close pattern"),
            clickable_block: format!(
                "<style id=\"{CLICKABLE_STYLE_ID}\">\na, a *, [href] {{ pointer-events: auto !important; cursor: pointer !important; }}\n</style>"
            ),
        }
    }

    pub(super) fn neutralize_pointer_events(&self, markup: String) -> String {
        replace_all(&self.pointer_none, markup, "pointer-events:${1}auto")
    }

    /// Insert the style block before the first `</head>`, at most once.
    pub(super) fn inject_clickable_style(&self, markup: String) -> String {
        if markup.contains(CLICKABLE_STYLE_ID) {
            return markup;
        }
        let Some(close) = self.head_close.find(&markup) else {
            return markup;
        };

        let mut out = String::with_capacity(markup.len() + self.clickable_block.len());
        out.push_str(&markup[..close.start()]);
        out.push_str(&self.clickable_block);
        out.push_str(&markup[close.start()..]);
        out
    }
}
