//! Canonical query fingerprints
//!
//! A fingerprint is the cache key for a read operation: the operation kind
//! plus its structural parameters. Equality is structural; the 64-bit hash
//! is derived from a canonical JSON form and is stable across processes, so
//! it can be persisted by a store-backed backend.
//!
//! The hash is never a uniqueness guarantee on its own. Backends that index
//! by hash must store the canonical form alongside and verify it on read.

use crate::types::{Document, OperationKind, SortSpec};
use serde::{Deserialize, Serialize};
use std::hash::BuildHasher;

// Fixed seeds: the fingerprint hash is persisted by the store-backed
// backend, so it must not depend on per-process hasher state.
const HASH_SEEDS: (u64, u64, u64, u64) = (
    0x9e37_79b9_7f4a_7c15,
    0xd1b5_4a32_d192_ed03,
    0x8ebc_6af0_9c88_c6e3,
    0x5899_65cc_7537_4cc3,
);

/// Canonical representation of a read operation's parameters.
///
/// For `FindOne` and `Find`, the filter/projection/sort/skip/limit fields
/// describe the query and `pipeline` is `None`. For `Aggregate` it is the
/// other way around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFingerprint {
    pub kind: OperationKind,
    pub filter: Option<Document>,
    pub projection: Option<Document>,
    pub sort: Option<SortSpec>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    pub pipeline: Option<Vec<Document>>,
}

impl QueryFingerprint {
    /// Fingerprint for a point lookup
    pub fn find_one(filter: Option<Document>) -> Self {
        Self {
            kind: OperationKind::FindOne,
            filter,
            projection: None,
            sort: None,
            skip: None,
            limit: None,
            pipeline: None,
        }
    }

    /// Fingerprint for a multi-document query
    pub fn find(filter: Option<Document>) -> Self {
        Self {
            kind: OperationKind::Find,
            ..Self::find_one(filter)
        }
    }

    /// Fingerprint for an aggregation pipeline
    pub fn aggregate(pipeline: Vec<Document>) -> Self {
        Self {
            kind: OperationKind::Aggregate,
            filter: None,
            projection: None,
            sort: None,
            skip: None,
            limit: None,
            pipeline: Some(pipeline),
        }
    }

    /// Set the projection
    pub fn with_projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Set the sort specification
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the number of documents to skip
    pub fn with_skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the result limit
    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Canonical string form of this fingerprint.
    ///
    /// JSON objects serialize with sorted keys, so two structurally equal
    /// fingerprints always produce the same canonical string. This string is
    /// what hash-indexed backends store for equality verification.
    pub fn canonical(&self) -> String {
        // Serialization of these field types cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Deterministic 64-bit hash over the canonical form.
    ///
    /// `hash64(a) == hash64(b)` whenever `a == b`; the converse is not
    /// guaranteed, and callers must verify stored equality before trusting
    /// a hash-only match.
    pub fn hash64(&self) -> u64 {
        let state = ahash::RandomState::with_seeds(
            HASH_SEEDS.0,
            HASH_SEEDS.1,
            HASH_SEEDS.2,
            HASH_SEEDS.3,
        );
        state.hash_one(self.canonical())
    }

    /// Parse a fingerprint back from its canonical form
    pub fn from_canonical(canonical: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(canonical)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_equal_queries_equal_fingerprints() {
        let a = QueryFingerprint::find_one(Some(json!({"name": "AAPL", "year": 2023})));
        let b = QueryFingerprint::find_one(Some(json!({"year": 2023, "name": "AAPL"})));

        // Key order does not matter: objects canonicalize to sorted keys.
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.hash64(), b.hash64());
    }

    #[test]
    fn test_distinct_queries_distinct_fingerprints() {
        let a = QueryFingerprint::find_one(Some(json!({"name": "AAPL"})));
        let b = QueryFingerprint::find_one(Some(json!({"name": "MSFT"})));
        let c = QueryFingerprint::find(Some(json!({"name": "AAPL"})));

        assert_ne!(a, b);
        assert_ne!(a.canonical(), b.canonical());
        // Same filter, different operation kind: still a different key.
        assert_ne!(a.canonical(), c.canonical());
    }

    #[test]
    fn test_options_are_part_of_the_key() {
        let base = QueryFingerprint::find(Some(json!({"name": "AAPL"})));
        let sorted = QueryFingerprint::find(Some(json!({"name": "AAPL"})))
            .with_sort(vec![("timestamp".to_string(), -1)]);
        let skipped = QueryFingerprint::find(Some(json!({"name": "AAPL"}))).with_skip(1);
        let limited = QueryFingerprint::find(Some(json!({"name": "AAPL"}))).with_limit(10);

        assert_ne!(base.canonical(), sorted.canonical());
        assert_ne!(base.canonical(), skipped.canonical());
        assert_ne!(base.canonical(), limited.canonical());
    }

    #[test]
    fn test_hash_is_stable() {
        let fp = QueryFingerprint::aggregate(vec![json!({"$match": {"x": 1}})]);
        // Computed twice from independent values, not memoized state.
        let again = QueryFingerprint::aggregate(vec![json!({"$match": {"x": 1}})]);
        assert_eq!(fp.hash64(), again.hash64());
    }

    #[test]
    fn test_canonical_roundtrip() {
        let fp = QueryFingerprint::find(Some(json!({"a": [1, 2, {"b": null}]})))
            .with_projection(json!({"a": 1}))
            .with_limit(5);
        let parsed = QueryFingerprint::from_canonical(&fp.canonical()).unwrap();
        assert_eq!(fp, parsed);
        assert_eq!(fp.hash64(), parsed.hash64());
    }

    #[test]
    fn test_pipeline_order_matters() {
        let a = QueryFingerprint::aggregate(vec![
            json!({"$match": {"x": 1}}),
            json!({"$sort": {"y": 1}}),
        ]);
        let b = QueryFingerprint::aggregate(vec![
            json!({"$sort": {"y": 1}}),
            json!({"$match": {"x": 1}}),
        ]);
        assert_ne!(a.canonical(), b.canonical());
    }
}
