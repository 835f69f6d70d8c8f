//! Pluggable cache backends for doccache
//!
//! A backend owns the cache entries for exactly one (database, collection)
//! pair. Two implementations are provided:
//!
//! - **InMemoryBackend**: entries in a concurrent in-process map, O(1)
//!   get/set/delete
//! - **StoreBackend**: entries persisted as documents through a
//!   `DocumentStore` collaborator, indexed by (collection_name,
//!   fingerprint_hash) with the canonical fingerprint verified on read
//!
//! The `BackendRegistry` is the process-wide directory of live backends,
//! keyed by (database, collection), used for cross-collection invalidation.

pub mod backend;
pub mod memory;
pub mod registry;
pub mod stats;
pub mod store;

pub use backend::CacheBackend;
pub use memory::InMemoryBackend;
pub use registry::BackendRegistry;
pub use stats::CacheStats;
pub use store::{CacheDocument, DocumentStore, MemoryDocumentStore, StoreBackend};
