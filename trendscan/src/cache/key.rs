//! Deterministic cache-key derivation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Deterministic identifier for a (stage, category, date-window) combination.
///
/// A 64-character lowercase hex SHA-256 digest. Identical inputs always yield
/// the identical key; distinct inputs collide only with cryptographic
/// improbability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// The key as a hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the cache key for a stage invocation.
///
/// Each field is framed with a length prefix before hashing, so adjacent
/// fields can never blur into each other (`("a", "bc")` and `("ab", "c")`
/// hash differently no matter what the fields contain).
#[must_use]
pub fn derive_key(stage: &str, category: &str, start: &str, end: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    for field in [stage, category, start, end] {
        hasher.update((field.len() as u64).to_be_bytes());
        hasher.update(field.as_bytes());
    }
    CacheKey(hex::encode(hasher.finalize()))
}
