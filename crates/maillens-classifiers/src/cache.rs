//! Content-addressed classification cache
//!
//! Entries are keyed by a hash of (text prefix, category set, feature
//! signature), so a stale write can never be observed: two writers for the
//! same key carry identical values and last-writer-wins is safe.
//!
//! The cache is unbounded — there is no eviction policy. Callers that keep a
//! classifier alive across large workloads should `clear()` periodically or
//! bound it themselves.

use crate::classifier::Classification;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// How much of the input text participates in the cache key.
const KEY_TEXT_PREFIX: usize = 200;

/// Process-wide cache for classification results.
#[derive(Default)]
pub struct ClassificationCache {
    entries: RwLock<HashMap<String, Classification>>,
}

impl ClassificationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the cache key for a classification call.
    pub fn key(text: &str, category_signature: &str, feature_signature: &str) -> String {
        let prefix: String = text.chars().take(KEY_TEXT_PREFIX).collect();
        let mut hasher = Sha256::new();
        hasher.update(prefix.as_bytes());
        hasher.update(b"|");
        hasher.update(category_signature.as_bytes());
        hasher.update(b"|");
        hasher.update(feature_signature.as_bytes());
        let digest = hasher.finalize();
        format!("{digest:x}")
    }

    /// Look up a stored result. The returned clone has `cached` set.
    pub fn get(&self, key: &str) -> Option<Classification> {
        self.entries.read().get(key).map(|result| {
            let mut hit = result.clone();
            hit.cached = true;
            hit
        })
    }

    pub fn insert(&self, key: String, result: Classification) {
        self.entries.write().insert(key, result);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
