//! Fallback content for application shells that were archived before hydration.

use std::borrow::Cow;

use regex::Regex;

/// Empty mount points left behind by the client bundle.
const SHELL_MARKERS: [&str; 2] = [r#"<div class="main-window" id="root"></div>"#, r#"<div id="root"></div>"#];

#[derive(Debug)]
pub(super) struct ShellRules {
    title: Regex,
    description: Regex,
    description_reversed: Regex,
    fallback_title: String,
}

impl ShellRules {
    pub(super) fn new(fallback_title: &str) -> Self {
        Self {
            title: Regex::new(r"(?i)<title[^>]*>([^<]+)</title>").expect("invalid title pattern"),
            description: Regex::new(r#"(?i)<meta\s+name="description"\s+content="([^"]+)""#)
                .expect("invalid description pattern"),
            description_reversed: Regex::new(r#"(?i)<meta\s+content="([^"]+)"\s+name="description""#)
                .expect("invalid description pattern"),
            fallback_title: fallback_title.to_string(),
        }
    }

    /// Replace empty mount points with the page's title and description.
    pub(super) fn apply(&self, markup: String) -> String {
        if !SHELL_MARKERS.iter().any(|m| markup.contains(m)) {
            return markup;
        }

        let title = self
            .title
            .captures(&markup)
            .map(|c| c[1].trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.fallback_title.clone());
        let description = self
            .description
            .captures(&markup)
            .or_else(|| self.description_reversed.captures(&markup))
            .map(|c| c[1].to_string())
            .unwrap_or_default();

        let block = fallback_block(&escape_angle(&title), &escape_angle(&description));
        SHELL_MARKERS.iter().fold(markup, |acc, marker| {
            if !acc.contains(marker) {
                return acc;
            }
            // keep the mount point, fill it with the block
            let open = marker.trim_end_matches("</div>");
            acc.replace(marker, &format!("{open}{block}</div>"))
        })
    }
}

fn escape_angle(s: &str) -> Cow<'_, str> {
    if s.contains(['<', '>']) {
        Cow::Owned(s.replace('<', "&lt;").replace('>', "&gt;"))
    } else {
        Cow::Borrowed(s)
    }
}

fn fallback_block(title: &str, description: &str) -> String {
    format!(
        r#"
<div style="max-width: 800px; margin: 50px auto; padding: 20px; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;">
    <h1 style="color: #333;">{title}</h1>
    <p style="color: #666; font-size: 18px;">{description}</p>
    <hr style="margin: 30px 0; border: none; border-top: 1px solid #eee;">
    <p style="color: #999;">This page's full content was not archived. <a href="/" style="color: #e82f64;">Return to homepage</a></p>
</div>
"#
    )
}
