//! Core types for the doccache query-result cache
//!
//! This crate holds the types shared by every other doccache crate:
//!
//! - **QueryFingerprint**: canonical, hashable representation of a read query
//! - **CacheEntry**: cached value plus access/age/cost metadata
//! - **CacheConfig**: per-collection cache configuration
//! - **CacheError**: the error taxonomy for the whole workspace
//!
//! # Example
//!
//! ```ignore
//! use doccache_core::{QueryFingerprint, OperationKind};
//! use serde_json::json;
//!
//! let fp = QueryFingerprint::find_one(Some(json!({"name": "AAPL"})));
//! assert_eq!(fp.kind, OperationKind::FindOne);
//! let key = fp.hash64();
//! ```

pub mod config;
pub mod entry;
pub mod error;
pub mod fingerprint;
pub mod types;

pub use config::{BackendKind, CacheConfig, CachingMode, EvictionStrategy};
pub use entry::{now_millis, CacheEntry};
pub use error::{CacheError, Result};
pub use fingerprint::QueryFingerprint;
pub use types::{CacheDirective, CachedValue, Document, OperationKind, SortSpec};
