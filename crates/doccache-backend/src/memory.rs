//! In-process cache backend

use crate::backend::CacheBackend;
use crate::stats::CacheStats;
use async_trait::async_trait;
use dashmap::DashMap;
use doccache_core::{CacheConfig, CacheEntry, CachedValue, QueryFingerprint, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Cache backend holding entries in a concurrent in-process map.
///
/// Entries are keyed by the fingerprint's canonical string, so equality is
/// structural and hash collisions cannot alias entries. TTL is enforced
/// lazily on `get`; capacity is reclaimed out-of-band by the cleanup cycle.
pub struct InMemoryBackend {
    collection: String,
    config: CacheConfig,
    entries: DashMap<String, CacheEntry>,
    sequence: AtomicU64,
    stats: Arc<CacheStats>,
}

impl InMemoryBackend {
    /// Create a backend for the named collection
    pub fn new(collection: impl Into<String>, config: CacheConfig) -> Self {
        Self {
            collection: collection.into(),
            config,
            entries: DashMap::new(),
            sequence: AtomicU64::new(0),
            stats: Arc::new(CacheStats::new()),
        }
    }

    /// Current entry count
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the backend holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &QueryFingerprint) -> Result<Option<CachedValue>> {
        let canonical = key.canonical();

        let expired = match self.entries.get(&canonical) {
            None => {
                self.stats.record_miss();
                return Ok(None);
            }
            Some(entry) => {
                if entry.is_expired(self.config.ttl_seconds) {
                    true
                } else {
                    entry.touch();
                    let value = entry.value.clone();
                    self.stats.record_hit();
                    return Ok(Some(value));
                }
            }
        };

        // The map reference is released before mutating the map.
        if expired {
            self.entries.remove(&canonical);
            self.stats.record_expiration();
        }
        self.stats.record_miss();
        Ok(None)
    }

    async fn set(
        &self,
        key: QueryFingerprint,
        value: CachedValue,
        execution_time_ms: u64,
    ) -> Result<()> {
        let max_bytes = self.config.max_item_bytes;
        if max_bytes > 0 && value.approximate_size() > max_bytes {
            tracing::debug!(
                collection = %self.collection,
                "skipping cache insert, value exceeds max_item_bytes"
            );
            return Ok(());
        }

        let canonical = key.canonical();
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry::new(key, value, self.collection.clone(), execution_time_ms, sequence);
        self.entries.insert(canonical, entry);
        Ok(())
    }

    async fn delete(&self, key: &QueryFingerprint) -> Result<()> {
        self.entries.remove(&key.canonical());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        self.stats.record_invalidation();
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>> {
        Ok(self.entries.iter().map(|e| e.value().clone()).collect())
    }

    fn ttl_seconds(&self) -> u64 {
        self.config.ttl_seconds
    }

    fn max_items(&self) -> usize {
        self.config.max_items
    }

    fn max_item_bytes(&self) -> usize {
        self.config.max_item_bytes
    }

    fn collection_name(&self) -> &str {
        &self.collection
    }

    fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new("stocks", CacheConfig::default())
    }

    fn key(name: &str) -> QueryFingerprint {
        QueryFingerprint::find_one(Some(json!({"name": name})))
    }

    #[tokio::test]
    async fn test_set_get() {
        let backend = backend();
        let value = CachedValue::Single(Some(json!({"name": "AAPL", "price": 100})));

        backend.set(key("AAPL"), value.clone(), 5).await.unwrap();

        let hit = backend.get(&key("AAPL")).await.unwrap();
        assert_eq!(hit, Some(value));
        assert_eq!(backend.stats().hits(), 1);
    }

    #[tokio::test]
    async fn test_miss_is_not_an_error() {
        let backend = backend();
        let result = backend.get(&key("MSFT")).await.unwrap();
        assert!(result.is_none());
        assert_eq!(backend.stats().misses(), 1);
    }

    #[tokio::test]
    async fn test_absent_result_is_cacheable() {
        let backend = backend();
        backend
            .set(key("GOOG"), CachedValue::Single(None), 3)
            .await
            .unwrap();

        // "No document matched" is a hit, distinct from a cache miss.
        let hit = backend.get(&key("GOOG")).await.unwrap();
        assert_eq!(hit, Some(CachedValue::Single(None)));
    }

    #[tokio::test]
    async fn test_hit_refreshes_metadata() {
        let backend = backend();
        backend
            .set(key("AAPL"), CachedValue::Single(None), 5)
            .await
            .unwrap();

        backend.get(&key("AAPL")).await.unwrap();
        backend.get(&key("AAPL")).await.unwrap();

        let entries = backend.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].access_count(), 2);
    }

    #[tokio::test]
    async fn test_set_replaces_existing_entry() {
        let backend = backend();
        let first = CachedValue::Single(Some(json!({"price": 100})));
        let second = CachedValue::Single(Some(json!({"price": 200})));

        backend.set(key("AAPL"), first, 5).await.unwrap();
        backend.set(key("AAPL"), second.clone(), 7).await.unwrap();

        assert_eq!(backend.len(), 1);
        assert_eq!(backend.get(&key("AAPL")).await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_delete_absent_is_noop() {
        let backend = backend();
        backend.delete(&key("AAPL")).await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let backend = backend();
        backend
            .set(key("AAPL"), CachedValue::Single(None), 1)
            .await
            .unwrap();
        backend
            .set(key("MSFT"), CachedValue::Single(None), 1)
            .await
            .unwrap();

        backend.clear().await.unwrap();
        assert!(backend.is_empty());

        backend.clear().await.unwrap();
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_ttl_enforced_lazily_on_get() {
        let config = CacheConfig::default().with_ttl_seconds(1);
        let backend = InMemoryBackend::new("stocks", config);
        backend
            .set(key("AAPL"), CachedValue::Single(None), 1)
            .await
            .unwrap();

        // Backdate the entry past its TTL instead of sleeping.
        {
            let canonical = key("AAPL").canonical();
            let mut entry = backend.entries.get_mut(&canonical).unwrap();
            entry.created_at_ms -= 5_000;
        }

        assert!(backend.get(&key("AAPL")).await.unwrap().is_none());
        assert_eq!(backend.stats().expirations(), 1);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_oversized_value_not_cached() {
        let config = CacheConfig::default().with_max_item_bytes(16);
        let backend = InMemoryBackend::new("stocks", config);

        let value = CachedValue::Single(Some(json!({"blob": "x".repeat(100)})));
        backend.set(key("AAPL"), value, 1).await.unwrap();

        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_access() {
        let backend = Arc::new(backend());
        let mut handles = Vec::new();

        for i in 0..10 {
            let backend = Arc::clone(&backend);
            handles.push(tokio::spawn(async move {
                let fp = QueryFingerprint::find_one(Some(json!({"i": i})));
                backend
                    .set(fp.clone(), CachedValue::Single(None), 1)
                    .await
                    .unwrap();
                backend.get(&fp).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(backend.len(), 10);
        assert_eq!(backend.stats().hits(), 10);
    }
}
