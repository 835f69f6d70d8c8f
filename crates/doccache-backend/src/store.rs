//! Store-backed cache backend
//!
//! Persists entries as documents through a `DocumentStore` collaborator,
//! in a cache database/collection dedicated to this layer and distinct from
//! the application's data. Lookups are indexed by (collection_name,
//! fingerprint_hash); because a 64-bit hash is not a uniqueness guarantee,
//! the canonical fingerprint is stored alongside and verified on every read.
//! A mismatched fingerprint is a collision and is treated as a miss.

use crate::backend::CacheBackend;
use crate::stats::CacheStats;
use async_trait::async_trait;
use dashmap::DashMap;
use doccache_core::{
    now_millis, CacheConfig, CacheEntry, CachedValue, QueryFingerprint, Result,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Physical shape of one persisted cache entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheDocument {
    /// Name of the cached collection this entry belongs to
    pub collection_name: String,
    /// Stable hash of the fingerprint; half of the compound index key
    pub fingerprint_hash: u64,
    /// Canonical fingerprint, verified on read to rule out hash collisions
    pub fingerprint: String,
    /// The cached result
    pub value: CachedValue,
    /// Cost of the original query in milliseconds
    pub execution_time_ms: u64,
    /// Creation time, epoch milliseconds
    pub timestamp: u64,
    /// Last access time, epoch milliseconds
    pub last_access_ms: u64,
    /// Number of hits served from this entry
    pub access_count: u64,
    /// Insertion sequence for deterministic eviction tie-breaks
    pub sequence: u64,
}

/// Storage collaborator for the store-backed backend.
///
/// Implemented over the real document store's driver by the embedding
/// application. Writes should use a relaxed-durability (fire-and-forget)
/// acknowledgement mode so cache population never adds latency to the read
/// path; that choice lives in the implementation, not in this trait.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the compound (collection_name, fingerprint_hash) index if it
    /// does not exist. Called once, lazily, before the first operation.
    async fn ensure_index(&self) -> Result<()>;

    /// Insert or replace the document for (collection_name, fingerprint_hash)
    async fn upsert(&self, doc: CacheDocument) -> Result<()>;

    /// Fetch the document for (collection_name, fingerprint_hash)
    async fn fetch(&self, collection_name: &str, hash: u64) -> Result<Option<CacheDocument>>;

    /// Remove the document for (collection_name, fingerprint_hash) if present
    async fn remove(&self, collection_name: &str, hash: u64) -> Result<()>;

    /// Remove every document for the named collection
    async fn remove_all(&self, collection_name: &str) -> Result<()>;

    /// All documents for the named collection
    async fn scan(&self, collection_name: &str) -> Result<Vec<CacheDocument>>;

    /// Number of documents for the named collection. Implementations with a
    /// native count should override this scan-based default.
    async fn count(&self, collection_name: &str) -> Result<usize> {
        Ok(self.scan(collection_name).await?.len())
    }
}

/// Cache backend persisting entries through a `DocumentStore`.
pub struct StoreBackend {
    collection: String,
    config: CacheConfig,
    store: Arc<dyn DocumentStore>,
    index_ready: OnceCell<()>,
    sequence: AtomicU64,
    stats: Arc<CacheStats>,
}

impl StoreBackend {
    /// Create a backend for the named collection over the given store
    pub fn new(
        collection: impl Into<String>,
        config: CacheConfig,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            collection: collection.into(),
            config,
            store,
            index_ready: OnceCell::new(),
            sequence: AtomicU64::new(0),
            stats: Arc::new(CacheStats::new()),
        }
    }

    async fn ready(&self) -> Result<()> {
        self.index_ready
            .get_or_try_init(|| self.store.ensure_index())
            .await?;
        Ok(())
    }

    fn entry_from_document(&self, doc: CacheDocument) -> Option<CacheEntry> {
        let fingerprint = match QueryFingerprint::from_canonical(&doc.fingerprint) {
            Ok(fp) => fp,
            Err(err) => {
                tracing::warn!(
                    collection = %self.collection,
                    error = %err,
                    "skipping unparseable cache document"
                );
                return None;
            }
        };
        let mut entry = CacheEntry::new(
            fingerprint,
            doc.value,
            doc.collection_name,
            doc.execution_time_ms,
            doc.sequence,
        );
        entry.created_at_ms = doc.timestamp;
        entry.restore_access(doc.last_access_ms, doc.access_count);
        Some(entry)
    }
}

#[async_trait]
impl CacheBackend for StoreBackend {
    async fn get(&self, key: &QueryFingerprint) -> Result<Option<CachedValue>> {
        self.ready().await?;
        let hash = key.hash64();
        let canonical = key.canonical();

        let doc = match self.store.fetch(&self.collection, hash).await? {
            Some(doc) => doc,
            None => {
                self.stats.record_miss();
                return Ok(None);
            }
        };

        // Hash-only matches are not trusted: verify the stored fingerprint.
        if doc.fingerprint != canonical {
            tracing::warn!(
                collection = %self.collection,
                hash,
                "fingerprint hash collision, treating as miss"
            );
            self.stats.record_miss();
            return Ok(None);
        }

        let now = now_millis();
        if self.config.ttl_seconds > 0
            && now.saturating_sub(doc.timestamp) > self.config.ttl_seconds * 1000
        {
            self.store.remove(&self.collection, hash).await?;
            self.stats.record_expiration();
            self.stats.record_miss();
            return Ok(None);
        }

        let value = doc.value.clone();

        // Refresh access metadata. Failure here only degrades eviction
        // accuracy, so it is logged rather than surfaced.
        let touched = CacheDocument {
            last_access_ms: now,
            access_count: doc.access_count + 1,
            ..doc
        };
        if let Err(err) = self.store.upsert(touched).await {
            tracing::warn!(
                collection = %self.collection,
                error = %err,
                "failed to refresh access metadata"
            );
        }

        self.stats.record_hit();
        Ok(Some(value))
    }

    async fn set(
        &self,
        key: QueryFingerprint,
        value: CachedValue,
        execution_time_ms: u64,
    ) -> Result<()> {
        self.ready().await?;

        let max_bytes = self.config.max_item_bytes;
        if max_bytes > 0 && value.approximate_size() > max_bytes {
            tracing::debug!(
                collection = %self.collection,
                "skipping cache insert, value exceeds max_item_bytes"
            );
            return Ok(());
        }

        let now = now_millis();
        let doc = CacheDocument {
            collection_name: self.collection.clone(),
            fingerprint_hash: key.hash64(),
            fingerprint: key.canonical(),
            value,
            execution_time_ms,
            timestamp: now,
            last_access_ms: now,
            access_count: 0,
            sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
        };
        self.store.upsert(doc).await
    }

    async fn delete(&self, key: &QueryFingerprint) -> Result<()> {
        self.ready().await?;
        self.store.remove(&self.collection, key.hash64()).await
    }

    async fn clear(&self) -> Result<()> {
        self.ready().await?;
        self.store.remove_all(&self.collection).await?;
        self.stats.record_invalidation();
        Ok(())
    }

    async fn entries(&self) -> Result<Vec<CacheEntry>> {
        self.ready().await?;
        let docs = self.store.scan(&self.collection).await?;
        Ok(docs
            .into_iter()
            .filter_map(|doc| self.entry_from_document(doc))
            .collect())
    }

    async fn shutdown(&self) -> Result<()> {
        // Persisted entries would otherwise outlive the process and go
        // stale for the next one pointed at the same store.
        tracing::debug!(collection = %self.collection, "clearing persisted cache entries");
        self.store.remove_all(&self.collection).await
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

/// Reference `DocumentStore` keeping documents in a concurrent in-process
/// map. Used as a test double and as a template for driver-backed
/// implementations; the compound index is implicit in the map key.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: DashMap<(String, u64), CacheDocument>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total documents across all collections
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ensure_index(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, doc: CacheDocument) -> Result<()> {
        self.docs
            .insert((doc.collection_name.clone(), doc.fingerprint_hash), doc);
        Ok(())
    }

    async fn fetch(&self, collection_name: &str, hash: u64) -> Result<Option<CacheDocument>> {
        Ok(self
            .docs
            .get(&(collection_name.to_string(), hash))
            .map(|d| d.value().clone()))
    }

    async fn remove(&self, collection_name: &str, hash: u64) -> Result<()> {
        self.docs.remove(&(collection_name.to_string(), hash));
        Ok(())
    }

    async fn remove_all(&self, collection_name: &str) -> Result<()> {
        self.docs.retain(|(name, _), _| name != collection_name);
        Ok(())
    }

    async fn scan(&self, collection_name: &str) -> Result<Vec<CacheDocument>> {
        Ok(self
            .docs
            .iter()
            .filter(|d| d.key().0 == collection_name)
            .map(|d| d.value().clone())
            .collect())
    }

    async fn count(&self, collection_name: &str) -> Result<usize> {
        Ok(self
            .docs
            .iter()
            .filter(|d| d.key().0 == collection_name)
            .count())
    }
}
