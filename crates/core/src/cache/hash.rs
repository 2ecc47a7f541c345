//! Content-addressed cache key generation.

use sha2::{Digest, Sha256};

use crate::RequestPath;

/// Compute the cache key for a normalized request path.
///
/// The key is the lowercase hex SHA-256 of the path and doubles as the
/// entry's file stem.
pub fn compute_cache_key(path: &RequestPath) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_str().as_bytes());
    hex::encode(hasher.finalize())
}
