//! Unified error types for lazarus.
//!
//! Adapter failures never surface here: the fetch adapters fold them into a
//! [`FetchResult`](crate::FetchResult) status. These cover local state only.

use std::path::PathBuf;

/// Unified error types for the mirror server.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request path could not be normalized.
    #[error("INVALID_PATH: {0}")]
    InvalidPath(String),

    /// Cache entry exists but could not be read.
    #[error("CACHE_READ: {path}: {source}")]
    CacheRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cache entry could not be written or committed.
    #[error("CACHE_WRITE: {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Short machine-readable code, matching the message prefix.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidPath(_) => "INVALID_PATH",
            Error::CacheRead { .. } => "CACHE_READ",
            Error::CacheWrite { .. } => "CACHE_WRITE",
        }
    }
}
