//! Read-through/write-invalidate interception layer
//!
//! Sits between application code and a document-database driver. Reads
//! (`find_one`, `find`, `aggregate`) are served from a per-collection cache
//! backend when an equivalent query was executed before; writes clear that
//! collection's cache before delegating to the real driver. Aggregation
//! pipelines ending in a `$out`/`$merge` stage invalidate the target
//! collection's cache through the backend registry and are never cached.
//!
//! The real driver is consumed through the `QueryCollaborator` trait and
//! treated as a black box: execute the query, return the result, report the
//! elapsed time. Cache failures never surface to the application; the layer
//! degrades to running the real operation and logs the degradation.
//!
//! # Example
//!
//! ```ignore
//! use doccache_client::{CachedClient, FindOptions};
//! use doccache_core::CacheConfig;
//! use serde_json::json;
//!
//! let client = CachedClient::new(driver, CacheConfig::default())?;
//! let stocks = client.database("app").collection("stocks")?;
//!
//! // First call executes the real query, second is served from cache.
//! let doc = stocks.find_one(Some(json!({"name": "AAPL"})), FindOptions::default()).await?;
//! let doc = stocks.find_one(Some(json!({"name": "AAPL"})), FindOptions::default()).await?;
//!
//! // Writes invalidate before delegating.
//! stocks.update_one(json!({"name": "AAPL"}), json!({"$set": {"price": 110}})).await?;
//! ```

pub mod client;
pub mod collaborator;
pub mod collection;
pub mod cursor;
pub mod policy;

pub use client::{CachedClient, CachedDatabase};
pub use collaborator::{QueryCollaborator, ReadQuery, WriteOperation, WriteOutcome};
pub use collection::{AggregateOptions, CachedCollection, FindOptions};
pub use cursor::DocumentCursor;
