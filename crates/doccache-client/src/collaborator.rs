//! The external query collaborator seam
//!
//! The real database driver is consumed through `QueryCollaborator`; this
//! layer never inspects how queries execute, only what they return and how
//! long they took. Driver errors propagate unchanged to the caller after any
//! required invalidation has run.

use async_trait::async_trait;
use doccache_core::{CachedValue, Document, OperationKind, QueryFingerprint, Result, SortSpec};

/// Structural parameters of one read operation, mirroring the fingerprint
/// fields. `pipeline` is set for aggregations, the other shape fields for
/// point lookups and multi-document queries.
#[derive(Debug, Clone)]
pub struct ReadQuery {
    pub kind: OperationKind,
    pub filter: Option<Document>,
    pub projection: Option<Document>,
    pub sort: Option<SortSpec>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    pub pipeline: Option<Vec<Document>>,
}

impl ReadQuery {
    /// Point lookup
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

    /// Multi-document query
    pub fn find(filter: Option<Document>) -> Self {
        Self {
            kind: OperationKind::Find,
            ..Self::find_one(filter)
        }
    }

    /// Aggregation pipeline
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

    /// The cache key for this query
    pub fn fingerprint(&self) -> QueryFingerprint {
        QueryFingerprint {
            kind: self.kind,
            filter: self.filter.clone(),
            projection: self.projection.clone(),
            sort: self.sort.clone(),
            skip: self.skip,
            limit: self.limit,
            pipeline: self.pipeline.clone(),
        }
    }
}

/// The mutating operations the cache layer intercepts. Every one of them
/// invalidates the collection's cache before delegating.
#[derive(Debug, Clone)]
pub enum WriteOperation {
    InsertOne(Document),
    InsertMany(Vec<Document>),
    UpdateOne { filter: Document, update: Document },
    UpdateMany { filter: Document, update: Document },
    DeleteOne(Document),
    DeleteMany(Document),
    ReplaceOne { filter: Document, replacement: Document },
    FindOneAndUpdate { filter: Document, update: Document },
    FindOneAndReplace { filter: Document, replacement: Document },
    FindOneAndDelete(Document),
}

/// Driver-reported outcome of a write
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    pub inserted_count: u64,
    pub deleted_count: u64,
    /// Returned document for the find-and-modify family
    pub document: Option<Document>,
}

/// Black-box query execution seam over the real driver.
#[async_trait]
pub trait QueryCollaborator: Send + Sync {
    /// Execute a read and return its full result set
    async fn execute_read(
        &self,
        database: &str,
        collection: &str,
        query: &ReadQuery,
    ) -> Result<CachedValue>;

    /// Execute a write and return the driver's outcome
    async fn execute_write(
        &self,
        database: &str,
        collection: &str,
        operation: &WriteOperation,
    ) -> Result<WriteOutcome>;
}
