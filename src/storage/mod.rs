/*!
 * Storage capabilities consumed by the translation engine.
 *
 * Both stores are plain key/value collaborators: the cache maps content
 * hashes to translated text, the session store holds at most one resumable
 * job snapshot. Failures are surfaced as errors here and downgraded to
 * warnings (cache) or logged losses (session) by the callers; the engine
 * must keep working against a store that silently no-ops.
 */

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::translation::session::TranslationSession;

pub mod sqlite;

/// Content-addressed translation cache.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Fetch a cached value.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, overwriting any previous entry.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Persistence for the resumable translation session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist the session snapshot, replacing any previous one.
    async fn save(&self, session: &TranslationSession) -> Result<()>;

    /// Load the stored session, if any. Staleness is the caller's concern.
    async fn load(&self) -> Result<Option<TranslationSession>>;

    /// Discard the stored session.
    async fn clear(&self) -> Result<()>;
}

/// In-memory cache store backed by a hash map.
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// In-memory session store holding at most one snapshot.
#[derive(Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<TranslationSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &TranslationSession) -> Result<()> {
        *self.session.write() = Some(session.clone());
        Ok(())
    }

    async fn load(&self) -> Result<Option<TranslationSession>> {
        Ok(self.session.read().clone())
    }

    async fn clear(&self) -> Result<()> {
        *self.session.write() = None;
        Ok(())
    }
}
