//! Cache entries and their access metadata

use crate::fingerprint::QueryFingerprint;
use crate::types::CachedValue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// One cached query result with the metadata the eviction strategies need.
///
/// The value is immutable once stored; only the recency/frequency counters
/// change, and those are atomic so concurrent hits never tear an entry.
#[derive(Debug)]
pub struct CacheEntry {
    /// The fingerprint this entry was stored under
    pub fingerprint: QueryFingerprint,
    /// The cached result
    pub value: CachedValue,
    /// Name of the collection that owns this entry
    pub collection_name: String,
    /// Stable hash of the fingerprint
    pub fingerprint_hash: u64,
    /// How long the original query took, in milliseconds
    pub execution_time_ms: u64,
    /// Creation time, epoch milliseconds
    pub created_at_ms: u64,
    /// Insertion sequence within the owning backend, for deterministic
    /// eviction tie-breaks
    pub sequence: u64,
    last_access_ms: AtomicU64,
    access_count: AtomicU64,
}

impl CacheEntry {
    /// Create a new entry, timestamped now
    pub fn new(
        fingerprint: QueryFingerprint,
        value: CachedValue,
        collection_name: impl Into<String>,
        execution_time_ms: u64,
        sequence: u64,
    ) -> Self {
        let now = now_millis();
        let fingerprint_hash = fingerprint.hash64();
        Self {
            fingerprint,
            value,
            collection_name: collection_name.into(),
            fingerprint_hash,
            execution_time_ms,
            created_at_ms: now,
            sequence,
            last_access_ms: AtomicU64::new(now),
            access_count: AtomicU64::new(0),
        }
    }

    /// Record a cache hit: refresh recency and bump the access count
    pub fn touch(&self) {
        self.last_access_ms.store(now_millis(), Ordering::Relaxed);
        self.access_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Last access time, epoch milliseconds
    pub fn last_access_ms(&self) -> u64 {
        self.last_access_ms.load(Ordering::Relaxed)
    }

    /// Number of hits served from this entry
    pub fn access_count(&self) -> u64 {
        self.access_count.load(Ordering::Relaxed)
    }

    /// Restore access metadata, used when an entry is rebuilt from a
    /// persistent store
    pub fn restore_access(&self, last_access_ms: u64, access_count: u64) {
        self.last_access_ms.store(last_access_ms, Ordering::Relaxed);
        self.access_count.store(access_count, Ordering::Relaxed);
    }

    /// Whether this entry is older than the given TTL.
    ///
    /// A TTL of zero means entries never expire.
    pub fn is_expired(&self, ttl_seconds: u64) -> bool {
        if ttl_seconds == 0 {
            return false;
        }
        now_millis().saturating_sub(self.created_at_ms) > ttl_seconds * 1000
    }
}

impl Clone for CacheEntry {
    fn clone(&self) -> Self {
        Self {
            fingerprint: self.fingerprint.clone(),
            value: self.value.clone(),
            collection_name: self.collection_name.clone(),
            fingerprint_hash: self.fingerprint_hash,
            execution_time_ms: self.execution_time_ms,
            created_at_ms: self.created_at_ms,
            sequence: self.sequence,
            last_access_ms: AtomicU64::new(self.last_access_ms()),
            access_count: AtomicU64::new(self.access_count()),
        }
    }
}
