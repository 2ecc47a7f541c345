//! Local files served ahead of the cache: SEO artifacts and the static tree.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use lazarus_core::RequestPath;

/// Content type for unknown extensions.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Content type derived from the file extension.
pub fn content_type_for(file: &Path) -> &'static str {
    let Some(ext) = file.extension().and_then(|e| e.to_str()) else {
        return OCTET_STREAM;
    };
    match ext.to_ascii_lowercase().as_str() {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "txt" => "text/plain",
        "xml" => "application/xml",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        _ => OCTET_STREAM,
    }
}

/// Well-known root files served from the SEO directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeoFile {
    Sitemap,
    Robots,
}

impl SeoFile {
    pub fn from_path(path: &RequestPath) -> Option<Self> {
        match path.as_str() {
            "/sitemap.xml" => Some(SeoFile::Sitemap),
            "/robots.txt" => Some(SeoFile::Robots),
            _ => None,
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            SeoFile::Sitemap => "sitemap.xml",
            SeoFile::Robots => "robots.txt",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            SeoFile::Sitemap => "application/xml",
            SeoFile::Robots => "text/plain",
        }
    }

    /// Read the file from `seo_dir`; `None` when it does not exist or cannot be read.
    pub async fn read(self, seo_dir: &Path) -> Option<Vec<u8>> {
        let file = seo_dir.join(self.file_name());
        match tokio::fs::read(&file).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!("failed to read {}: {e}", file.display());
                None
            }
        }
    }
}

/// The file a path maps to under `static_dir`, if any.
///
/// Directories map to their `index.html`. A directory without one does not match.
pub async fn resolve(static_dir: &Path, path: &RequestPath) -> Option<PathBuf> {
    let mut file = static_dir.join(path.relative());

    let meta = tokio::fs::metadata(&file).await.ok()?;
    if meta.is_dir() {
        file.push("index.html");
        let index = tokio::fs::metadata(&file).await.ok()?;
        return index.is_file().then_some(file);
    }
    meta.is_file().then_some(file)
}
