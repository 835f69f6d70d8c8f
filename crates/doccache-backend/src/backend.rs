//! The cache backend interface

use crate::stats::CacheStats;
use async_trait::async_trait;
use doccache_core::{CacheEntry, CachedValue, QueryFingerprint, Result};
use std::sync::Arc;

/// Store for the cache entries of one (database, collection) pair.
///
/// Absent keys are not errors: `get` returns `Ok(None)` and `delete` is a
/// no-op. Backend operations only fail on storage-collaborator errors, which
/// the policy layer treats as a miss and degrades to running the real query.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Look up a cached value. Refreshes the entry's recency/frequency
    /// metadata on a hit. Entries past their TTL are removed and reported
    /// absent.
    async fn get(&self, key: &QueryFingerprint) -> Result<Option<CachedValue>>;

    /// Insert or replace an entry, resetting its recency metadata and
    /// recording the cost of the query that produced it. Values larger than
    /// `max_item_bytes` are silently skipped. Never blocks on eviction.
    async fn set(
        &self,
        key: QueryFingerprint,
        value: CachedValue,
        execution_time_ms: u64,
    ) -> Result<()>;

    /// Remove one entry if present
    async fn delete(&self, key: &QueryFingerprint) -> Result<()>;

    /// Remove every entry owned by this backend. Safe to call concurrently
    /// with in-flight get/set; a racing set may survive and is reclaimed by
    /// the next invalidation or cleanup cycle.
    async fn clear(&self) -> Result<()>;

    /// Snapshot of the current entries, for eviction and inspection.
    /// Not a hot-path operation.
    async fn entries(&self) -> Result<Vec<CacheEntry>>;

    /// Release any resources owned by the backend. Store-backed
    /// implementations clear their persisted entries so stale cache
    /// documents do not leak across process restarts.
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    /// Entry TTL in seconds; 0 means entries never expire
    fn ttl_seconds(&self) -> u64;

    /// Soft bound on the entry count
    fn max_items(&self) -> usize;

    /// Largest cacheable value in serialized bytes; 0 disables the bound
    fn max_item_bytes(&self) -> usize;

    /// Name of the collection this backend serves
    fn collection_name(&self) -> &str;

    /// Hit/miss/eviction counters for this backend
    fn stats(&self) -> Arc<CacheStats>;
}
