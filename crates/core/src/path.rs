//! Request path normalization for routing and cache identity.

use std::fmt;

use crate::Error;

/// A normalized URL path: leading slash, no query, no fragment, no dot segments.
///
/// This is the identity key for both the content cache and the router.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestPath(String);

impl RequestPath {
    /// Normalize a raw request target into a path.
    ///
    /// Normalization steps:
    /// 1. Drop the query string (`?...`) and fragment (`#...`)
    /// 2. Drop empty and `.` segments
    /// 3. Resolve `..` against earlier segments, never above the root
    /// 4. Keep a trailing slash on non-root paths
    ///
    /// An empty input is the root.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        let end = raw.find(['?', '#']).unwrap_or(raw.len());
        let raw = raw[..end].trim();

        if raw.chars().any(|c| c.is_control()) {
            return Err(Error::InvalidPath(raw.escape_default().to_string()));
        }

        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }

        if segments.is_empty() {
            return Ok(Self::root());
        }

        let mut path = format!("/{}", segments.join("/"));
        if raw.ends_with('/') {
            path.push('/');
        }
        Ok(Self(path))
    }

    /// The site root, `/`.
    pub fn root() -> Self {
        Self("/".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path without its leading slash, suitable for joining under a directory.
    pub fn relative(&self) -> &str {
        &self.0[1..]
    }

    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }
}

impl fmt::Display for RequestPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RequestPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        RequestPath::parse(raw).unwrap().as_str().to_string()
    }

    #[test]
    fn test_parse_basic() {
        assert_eq!(norm("/blog"), "/blog");
        assert_eq!(norm("/blog/post-1"), "/blog/post-1");
    }

    #[test]
    fn test_parse_empty_is_root() {
        assert_eq!(norm(""), "/");
        assert_eq!(norm("/"), "/");
        assert!(RequestPath::parse("").unwrap().is_root());
    }

    #[test]
    fn test_parse_strips_query_and_fragment() {
        assert_eq!(norm("/blog?page=2"), "/blog");
        assert_eq!(norm("/blog#top"), "/blog");
        assert_eq!(norm("/?utm_source=x"), "/");
    }

    #[test]
    fn test_parse_adds_leading_slash() {
        assert_eq!(norm("templates"), "/templates");
    }

    #[test]
    fn test_parse_collapses_slashes_and_dots() {
        assert_eq!(norm("//a///b"), "/a/b");
        assert_eq!(norm("/a/./b"), "/a/b");
    }

    #[test]
    fn test_parse_dotdot_never_escapes_root() {
        assert_eq!(norm("/../../etc/passwd"), "/etc/passwd");
        assert_eq!(norm("/a/b/../c"), "/a/c");
        assert_eq!(norm("/.."), "/");
    }

    #[test]
    fn test_parse_keeps_trailing_slash() {
        assert_eq!(norm("/blog/"), "/blog/");
        assert_eq!(norm("/blog/?x=1"), "/blog/");
    }

    #[test]
    fn test_parse_rejects_control_chars() {
        let result = RequestPath::parse("/a\nb");
        assert!(matches!(result, Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_relative() {
        assert_eq!(RequestPath::parse("/pfp/anime-pfp").unwrap().relative(), "pfp/anime-pfp");
        assert_eq!(RequestPath::root().relative(), "");
    }
}
