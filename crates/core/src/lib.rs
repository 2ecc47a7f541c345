//! Core types and shared functionality for lazarus.
//!
//! This crate provides:
//! - Request path normalization
//! - Fetch result model shared by the upstream adapters
//! - Content cache with a file-backed store
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod path;

pub use cache::{ContentStore, DiskStore, MemoryStore};
pub use config::{AppConfig, ConfigError, WaitCondition};
pub use error::Error;
pub use fetch::{FetchOutcome, FetchResult};
pub use path::RequestPath;
