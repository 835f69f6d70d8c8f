//! Caching eligibility and pipeline side-effect detection
//!
//! Eligibility precedence, resolved to one rule:
//!
//! 1. A per-call `CacheDirective::Always`/`Never` wins outright.
//! 2. Otherwise, if the collection configures an explicit allow-list, the
//!    operation is cached iff its kind is in the list.
//! 3. Otherwise the default mode decides: `CacheAll` caches, `CacheNone`
//!    does not.

use doccache_core::{CacheConfig, CacheDirective, CachingMode, Document, OperationKind};

/// Whether a read call should consult and populate the cache
pub fn is_cacheable(kind: OperationKind, directive: CacheDirective, config: &CacheConfig) -> bool {
    match directive {
        CacheDirective::Always => true,
        CacheDirective::Never => false,
        CacheDirective::Default => match &config.cached_operations {
            Some(allowed) => allowed.contains(&kind),
            None => config.mode == CachingMode::CacheAll,
        },
    }
}

/// Detect a pipeline whose final stage writes into another collection.
///
/// Returns the (database, collection) the pipeline writes to:
/// - `{"$out": "name"}` targets `name` in the current database
/// - `{"$out": {"db": d, "coll": c}}` targets the explicit pair
/// - `{"$merge": {"into": "name"}}` targets `name` in the current database
/// - `{"$merge": {"into": {"db": d, "coll": c}}}` targets the explicit pair
///
/// Only the last stage matters; the server rejects `$out`/`$merge` anywhere
/// else. A pipeline with such a stage is never cacheable: running it mutates
/// the target, and its result set is status metadata, not query data.
pub fn pipeline_write_target(
    current_database: &str,
    pipeline: &[Document],
) -> Option<(String, String)> {
    let last = pipeline.last()?.as_object()?;

    if let Some(out) = last.get("$out") {
        return destination(current_database, out);
    }
    if let Some(merge) = last.get("$merge") {
        return destination(current_database, merge.as_object()?.get("into")?);
    }
    None
}

fn destination(current_database: &str, spec: &serde_json::Value) -> Option<(String, String)> {
    match spec {
        serde_json::Value::String(coll) => Some((current_database.to_string(), coll.clone())),
        serde_json::Value::Object(fields) => {
            let coll = fields.get("coll")?.as_str()?.to_string();
            let db = fields
                .get("db")
                .and_then(|d| d.as_str())
                .unwrap_or(current_database)
                .to_string();
            Some((db, coll))
        }
        _ => None,
    }
}
