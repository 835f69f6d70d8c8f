//! Process-wide directory of live backends

use crate::backend::CacheBackend;
use dashmap::DashMap;
use doccache_core::Result;
use std::sync::Arc;

/// Directory mapping (database, collection) to the backend serving it.
///
/// Constructed once per client and injected into every backend owner; never
/// a hidden static. Enables cross-collection (and cross-database)
/// invalidation when an aggregation pipeline writes into another collection.
#[derive(Default)]
pub struct BackendRegistry {
    backends: DashMap<(String, String), Arc<dyn CacheBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend under its (database, collection) key. Replaces any
    /// previous registration for the key; the creator is responsible for
    /// keeping at most one live backend per pair.
    pub fn register(
        &self,
        database: impl Into<String>,
        collection: impl Into<String>,
        backend: Arc<dyn CacheBackend>,
    ) {
        self.backends
            .insert((database.into(), collection.into()), backend);
    }

    /// Remove the registration for a key, if any
    pub fn deregister(&self, database: &str, collection: &str) {
        self.backends
            .remove(&(database.to_string(), collection.to_string()));
    }

    /// Look up the backend for a key
    pub fn lookup(&self, database: &str, collection: &str) -> Option<Arc<dyn CacheBackend>> {
        self.backends
            .get(&(database.to_string(), collection.to_string()))
            .map(|b| Arc::clone(b.value()))
    }

    /// Clear the cache for a (database, collection) pair. A no-op when no
    /// backend is registered for the key: a write may target a collection
    /// that was never read through the cache layer.
    pub async fn clear_for(&self, database: &str, collection: &str) -> Result<()> {
        match self.lookup(database, collection) {
            Some(backend) => {
                tracing::debug!(database, collection, "invalidating cache via registry");
                backend.clear().await
            }
            None => Ok(()),
        }
    }

    /// Number of registered backends
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
