//! Per-collection cache configuration

use crate::error::{CacheError, Result};
use crate::types::OperationKind;
use std::time::Duration;

/// Which backend stores the entries for a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Entries held in an in-process concurrent map
    #[default]
    InMemory,
    /// Entries persisted as documents in a dedicated cache store
    Store,
}

/// How entries are chosen for removal when a backend is over capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionStrategy {
    /// Evict the least recently accessed entries first
    #[default]
    Lru,
    /// Evict the least frequently accessed entries first
    Lfu,
    /// Evict the cheapest-to-recompute entries first: an expensive query is
    /// more valuable to keep cached than a cheap one
    ExecutionCost,
}

/// Default caching behavior when neither a per-call directive nor the
/// allow-list decides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachingMode {
    /// Cache every interceptable read operation
    #[default]
    CacheAll,
    /// Cache nothing unless a call forces it
    CacheNone,
}

/// Configuration for one collection's cache.
///
/// Inherited from client/database defaults; every field can be overridden
/// per collection with the `with_*` builders.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Which backend to use
    pub backend: BackendKind,
    /// Entry time-to-live in seconds; 0 disables expiry
    pub ttl_seconds: u64,
    /// Soft bound on the number of entries per backend
    pub max_items: usize,
    /// Largest single value, in serialized bytes, that will be cached;
    /// 0 disables the bound
    pub max_item_bytes: usize,
    /// Background cleanup cadence; `None` disables the background task
    /// (valid when eviction is driven synchronously by the caller)
    pub cleanup_cycle: Option<Duration>,
    /// Eviction strategy applied by the cleanup cycle
    pub eviction_strategy: EvictionStrategy,
    /// Explicit allow-list of cacheable operations; `None` defers entirely
    /// to `mode`
    pub cached_operations: Option<Vec<OperationKind>>,
    /// Default behavior when the allow-list does not decide
    pub mode: CachingMode,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::InMemory,
            ttl_seconds: 0,
            max_items: 1000,
            max_item_bytes: 1_000_000,
            cleanup_cycle: Some(Duration::from_secs(5)),
            eviction_strategy: EvictionStrategy::Lru,
            cached_operations: None,
            mode: CachingMode::CacheAll,
        }
    }
}

impl CacheConfig {
    /// Set the backend kind
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Set the entry TTL in seconds (0 disables expiry)
    pub fn with_ttl_seconds(mut self, ttl_seconds: u64) -> Self {
        self.ttl_seconds = ttl_seconds;
        self
    }

    /// Set the maximum entry count
    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    /// Set the maximum serialized size of a single cached value
    pub fn with_max_item_bytes(mut self, max_item_bytes: usize) -> Self {
        self.max_item_bytes = max_item_bytes;
        self
    }

    /// Set the background cleanup cadence; `None` disables background cleanup
    pub fn with_cleanup_cycle(mut self, cycle: Option<Duration>) -> Self {
        self.cleanup_cycle = cycle;
        self
    }

    /// Set the eviction strategy
    pub fn with_eviction_strategy(mut self, strategy: EvictionStrategy) -> Self {
        self.eviction_strategy = strategy;
        self
    }

    /// Set the explicit allow-list of cacheable operations
    pub fn with_cached_operations(mut self, operations: Vec<OperationKind>) -> Self {
        self.cached_operations = Some(operations);
        self
    }

    /// Set the default caching mode
    pub fn with_mode(mut self, mode: CachingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Validate the configuration; invalid configuration is fatal at
    /// construction time rather than silently defaulted.
    pub fn validate(&self) -> Result<()> {
        if self.max_items == 0 {
            return Err(CacheError::InvalidConfig(
                "max_items must be greater than zero".to_string(),
            ));
        }
        if let Some(cycle) = self.cleanup_cycle {
            if cycle.is_zero() {
                return Err(CacheError::InvalidConfig(
                    "cleanup_cycle must be non-zero; use None to disable background cleanup"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }
}
