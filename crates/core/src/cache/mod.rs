//! Content cache for rewritten pages.
//!
//! This module provides the path-keyed store the router consults before any
//! upstream fetch. It supports:
//!
//! - Content-addressed filenames using SHA-256 of the normalized path
//! - Write-once entries committed by atomic rename
//! - A disk-backed store and an in-memory store behind one trait
//!
//! There is no eviction, size bound or TTL.

pub mod hash;
pub mod store;

pub use hash::compute_cache_key;
pub use store::{ContentStore, DiskStore, MemoryStore};
