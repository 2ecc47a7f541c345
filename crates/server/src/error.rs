//! Startup errors for the lazarus server.
//!
//! Request handling never fails: every request ends in a 200 or a 404 page.

use std::net::SocketAddr;

use lazarus_client::ArchiveError;
use lazarus_client::rewrite::PatternError;
use lazarus_core::{ConfigError, Error};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("CONFIG: {0}")]
    Config(#[from] ConfigError),

    #[error("CACHE: {0}")]
    Cache(#[from] Error),

    #[error("REWRITER: {0}")]
    Rewriter(#[from] PatternError),

    #[error("ARCHIVE: {0}")]
    Archive(#[from] ArchiveError),

    #[error("BIND: {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}
