//! Shared value and operation types

use serde::{Deserialize, Serialize};

/// A single document, as exchanged with the database collaborator.
///
/// The driver wire format is out of scope here; documents are plain JSON
/// values with deterministic (key-sorted) object serialization.
pub type Document = serde_json::Value;

/// Sort specification: ordered (field, direction) pairs, direction is
/// 1 for ascending and -1 for descending.
pub type SortSpec = Vec<(String, i32)>;

/// The read operations the cache layer intercepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// Point lookup returning at most one document
    FindOne,
    /// Multi-document query returning an ordered result set
    Find,
    /// Aggregation pipeline
    Aggregate,
}

/// Per-call caching override, resolved before allow-list and default mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheDirective {
    /// Defer to the collection's allow-list and default mode
    #[default]
    Default,
    /// Cache this call regardless of configuration
    Always,
    /// Bypass the cache for this call regardless of configuration
    Never,
}

/// A cached query result: either a point-lookup outcome (which may be
/// "no document matched") or an ordered list of documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CachedValue {
    /// Result of a point lookup; `None` means the query matched nothing,
    /// which is itself a cacheable outcome
    Single(Option<Document>),
    /// Ordered result set of a multi-document query or aggregation
    Many(Vec<Document>),
}

impl CachedValue {
    /// Approximate serialized size in bytes, used for the max-item-size bound
    pub fn approximate_size(&self) -> usize {
        serde_json::to_vec(self).map(|v| v.len()).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cached_value_size() {
        let small = CachedValue::Single(Some(json!({"a": 1})));
        let large = CachedValue::Many(vec![json!({"a": "x".repeat(100)}); 10]);

        assert!(small.approximate_size() > 0);
        assert!(large.approximate_size() > small.approximate_size());
    }

    #[test]
    fn test_cached_value_roundtrip() {
        let value = CachedValue::Many(vec![json!({"name": "AAPL"}), json!({"name": "MSFT"})]);
        let encoded = serde_json::to_string(&value).unwrap();
        let decoded: CachedValue = serde_json::from_str(&encoded).unwrap();
        assert_eq!(value, decoded);
    }

    #[test]
    fn test_directive_default() {
        assert_eq!(CacheDirective::default(), CacheDirective::Default);
    }
}
