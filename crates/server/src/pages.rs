//! Fixed HTML pages for the three 404 cases.

/// Why a request ended in a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotServed {
    /// Remote fetching is switched off.
    RemoteDisabled,
    /// The archive answered 200 with no content.
    ArchiveEmpty,
    /// No source had the page.
    NotFound,
}

impl NotServed {
    pub fn render(self, path: impl AsRef<str>) -> String {
        let path = escape(path.as_ref());
        let (title, heading, message) = match self {
            NotServed::RemoteDisabled => (
                "Content Unavailable",
                "Content Unavailable",
                format!("The page {path} is not available in static-only mode."),
            ),
            NotServed::ArchiveEmpty => (
                "Content Unavailable",
                "Content Unavailable",
                format!("The archived content for {path} could not be retrieved."),
            ),
            NotServed::NotFound => {
                ("Page Not Found", "404 - Page Not Found", format!("The page {path} could not be found."))
            }
        };

        format!(
            "<!DOCTYPE html>\n<html>\n<head><title>{title}</title></head>\n<body>\n<h1>{heading}</h1>\n<p>{message}</p>\n<p><a href=\"/\">Go to homepage</a></p>\n</body>\n</html>\n"
        )
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}
