/*!
 * Content-addressed translation cache.
 *
 * Keys combine the batch text with a configuration suffix (provider id,
 * language pair, mode) so entries never collide across translation setups.
 * Store failures are downgraded to misses; a broken cache costs redundant
 * provider calls, never wrong results.
 */

use std::sync::Arc;

use log::{debug, warn};
use sha2::{Digest, Sha256};

use crate::storage::CacheStore;

/// Deterministic cache key for a text under a configuration suffix.
pub fn cache_key(text: &str, suffix: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update(b":");
    hasher.update(suffix.as_bytes());
    let digest = hasher.finalize();
    let hex = format!("{:x}", digest);
    format!("cache_{}", &hex[..32])
}

/// Cache facade used by the batcher.
#[derive(Clone)]
pub struct TranslationCache {
    store: Arc<dyn CacheStore>,
    enabled: bool,
}

impl TranslationCache {
    /// Create a cache backed by the given store.
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store, enabled: true }
    }

    /// Create a cache that never hits and never stores.
    pub fn disabled(store: Arc<dyn CacheStore>) -> Self {
        Self { store, enabled: false }
    }

    /// Whether the cache is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fetch a cached translation. Store errors read as misses.
    pub async fn get(&self, key: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        match self.store.get(key).await {
            Ok(Some(value)) => {
                debug!("Cache hit for {}", key);
                Some(value)
            }
            Ok(None) => {
                debug!("Cache miss for {}", key);
                None
            }
            Err(e) => {
                warn!("Cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    /// Store a translation. Store errors are logged and swallowed.
    pub async fn set(&self, key: &str, value: &str) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.store.set(key, value).await {
            warn!("Cache write failed for {}: {}", key, e);
        }
    }
}
