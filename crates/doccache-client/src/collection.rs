//! Per-collection interception of reads and writes

use crate::collaborator::{QueryCollaborator, ReadQuery, WriteOperation, WriteOutcome};
use crate::cursor::DocumentCursor;
use crate::policy;
use doccache_backend::{
    BackendRegistry, CacheBackend, CacheStats, DocumentStore, InMemoryBackend, StoreBackend,
};
use doccache_core::{
    BackendKind, CacheConfig, CacheDirective, CacheError, CachedValue, Document, Result, SortSpec,
};
use doccache_eviction::{CleanupScheduler, EvictionController};
use std::sync::Arc;
use std::time::Instant;

/// Per-call options for `find_one` and `find`
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub projection: Option<Document>,
    pub sort: Option<SortSpec>,
    pub skip: Option<u64>,
    pub limit: Option<i64>,
    /// Per-call caching override; wins over allow-list and default mode
    pub directive: CacheDirective,
}

/// Per-call options for `aggregate`
#[derive(Debug, Clone, Default)]
pub struct AggregateOptions {
    /// Per-call caching override; wins over allow-list and default mode
    pub directive: CacheDirective,
}

/// A collection handle with read-through caching and write invalidation.
///
/// Created through `CachedDatabase::collection`, which guarantees at most
/// one live backend per (database, collection) pair. All cache failures
/// degrade to executing the real operation; the application only ever sees
/// the correct result or the driver's own error.
pub struct CachedCollection {
    database: String,
    name: String,
    config: CacheConfig,
    backend: Arc<dyn CacheBackend>,
    registry: Arc<BackendRegistry>,
    collaborator: Arc<dyn QueryCollaborator>,
    scheduler: Option<CleanupScheduler>,
}

impl CachedCollection {
    /// Build the collection handle: construct its backend, register it, and
    /// start the cleanup scheduler if one is configured. Must be called
    /// within a tokio runtime when a cleanup cycle is configured.
    pub fn new(
        database: impl Into<String>,
        name: impl Into<String>,
        config: CacheConfig,
        collaborator: Arc<dyn QueryCollaborator>,
        registry: Arc<BackendRegistry>,
        store: Option<Arc<dyn DocumentStore>>,
    ) -> Result<Self> {
        config.validate()?;
        let database = database.into();
        let name = name.into();

        let backend: Arc<dyn CacheBackend> = match config.backend {
            BackendKind::InMemory => Arc::new(InMemoryBackend::new(name.clone(), config.clone())),
            BackendKind::Store => {
                let store = store.ok_or_else(|| {
                    CacheError::InvalidConfig(
                        "store-backed cache requires a DocumentStore".to_string(),
                    )
                })?;
                Arc::new(StoreBackend::new(name.clone(), config.clone(), store))
            }
        };
        registry.register(database.clone(), name.clone(), Arc::clone(&backend));

        let scheduler = config.cleanup_cycle.map(|period| {
            CleanupScheduler::start(
                Arc::clone(&backend),
                EvictionController::new(config.eviction_strategy),
                period,
            )
        });

        Ok(Self {
            database,
            name,
            config,
            backend,
            registry,
            collaborator,
            scheduler,
        })
    }

    /// Collection name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning database name
    pub fn database(&self) -> &str {
        &self.database
    }

    /// This collection's cache backend
    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Cache counters for this collection
    pub fn cache_stats(&self) -> Arc<CacheStats> {
        self.backend.stats()
    }

    /// Find a single document
    pub async fn find_one(
        &self,
        filter: Option<Document>,
        options: FindOptions,
    ) -> Result<Option<Document>> {
        let mut query = ReadQuery::find_one(filter);
        query.projection = options.projection;
        query.sort = options.sort;
        query.skip = options.skip;
        query.limit = options.limit;

        match self.cached_read(query, options.directive).await? {
            CachedValue::Single(doc) => Ok(doc),
            CachedValue::Many(mut docs) => Ok(if docs.is_empty() {
                None
            } else {
                Some(docs.remove(0))
            }),
        }
    }

    /// Query the collection, returning a restartable cursor
    pub async fn find(
        &self,
        filter: Option<Document>,
        options: FindOptions,
    ) -> Result<DocumentCursor> {
        let mut query = ReadQuery::find(filter);
        query.projection = options.projection;
        query.sort = options.sort;
        query.skip = options.skip;
        query.limit = options.limit;

        match self.cached_read(query, options.directive).await? {
            CachedValue::Many(docs) => Ok(DocumentCursor::new(docs)),
            CachedValue::Single(doc) => Ok(DocumentCursor::new(doc.into_iter().collect())),
        }
    }

    /// Run an aggregation pipeline, returning a restartable cursor.
    ///
    /// A pipeline ending in `$out`/`$merge` invalidates the target
    /// collection's cache and always executes for real.
    pub async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        options: AggregateOptions,
    ) -> Result<DocumentCursor> {
        let query = ReadQuery::aggregate(pipeline);
        match self.cached_read(query, options.directive).await? {
            CachedValue::Many(docs) => Ok(DocumentCursor::new(docs)),
            CachedValue::Single(doc) => Ok(DocumentCursor::new(doc.into_iter().collect())),
        }
    }

    pub async fn insert_one(&self, document: Document) -> Result<WriteOutcome> {
        self.write(WriteOperation::InsertOne(document)).await
    }

    pub async fn insert_many(&self, documents: Vec<Document>) -> Result<WriteOutcome> {
        self.write(WriteOperation::InsertMany(documents)).await
    }

    pub async fn update_one(&self, filter: Document, update: Document) -> Result<WriteOutcome> {
        self.write(WriteOperation::UpdateOne { filter, update }).await
    }

    pub async fn update_many(&self, filter: Document, update: Document) -> Result<WriteOutcome> {
        self.write(WriteOperation::UpdateMany { filter, update }).await
    }

    pub async fn delete_one(&self, filter: Document) -> Result<WriteOutcome> {
        self.write(WriteOperation::DeleteOne(filter)).await
    }

    pub async fn delete_many(&self, filter: Document) -> Result<WriteOutcome> {
        self.write(WriteOperation::DeleteMany(filter)).await
    }

    pub async fn replace_one(
        &self,
        filter: Document,
        replacement: Document,
    ) -> Result<WriteOutcome> {
        self.write(WriteOperation::ReplaceOne { filter, replacement })
            .await
    }

    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
    ) -> Result<Option<Document>> {
        let outcome = self
            .write(WriteOperation::FindOneAndUpdate { filter, update })
            .await?;
        Ok(outcome.document)
    }

    pub async fn find_one_and_replace(
        &self,
        filter: Document,
        replacement: Document,
    ) -> Result<Option<Document>> {
        let outcome = self
            .write(WriteOperation::FindOneAndReplace { filter, replacement })
            .await?;
        Ok(outcome.document)
    }

    pub async fn find_one_and_delete(&self, filter: Document) -> Result<Option<Document>> {
        let outcome = self
            .write(WriteOperation::FindOneAndDelete(filter))
            .await?;
        Ok(outcome.document)
    }

    /// Stop the cleanup scheduler, release backend resources, and drop the
    /// registry entry. Called by `CachedClient::shutdown`.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some(scheduler) = &self.scheduler {
            scheduler.stop().await;
        }
        self.registry.deregister(&self.database, &self.name);
        self.backend.shutdown().await
    }

    async fn execute_real(&self, query: &ReadQuery) -> Result<CachedValue> {
        self.collaborator
            .execute_read(&self.database, &self.name, query)
            .await
    }

    /// Read path: eligibility, fingerprint, backend get, and on a miss the
    /// real query plus cache population with its measured cost.
    async fn cached_read(
        &self,
        query: ReadQuery,
        directive: CacheDirective,
    ) -> Result<CachedValue> {
        if let Some(pipeline) = &query.pipeline {
            if let Some((db, coll)) = policy::pipeline_write_target(&self.database, pipeline) {
                // The pipeline mutates another collection: invalidate it and
                // never serve or store this execution from cache.
                if let Err(err) = self.registry.clear_for(&db, &coll).await {
                    tracing::warn!(
                        database = %db,
                        collection = %coll,
                        error = %err,
                        "pipeline target invalidation failed"
                    );
                }
                return self.execute_real(&query).await;
            }
        }

        if !policy::is_cacheable(query.kind, directive, &self.config) {
            return self.execute_real(&query).await;
        }

        let fingerprint = query.fingerprint();
        match self.backend.get(&fingerprint).await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(
                    collection = %self.name,
                    error = %err,
                    "cache backend unavailable, executing query directly"
                );
                return self.execute_real(&query).await;
            }
        }

        let start = Instant::now();
        let value = self.execute_real(&query).await?;
        let execution_time_ms = start.elapsed().as_millis() as u64;

        if let Err(err) = self
            .backend
            .set(fingerprint, value.clone(), execution_time_ms)
            .await
        {
            tracing::warn!(
                collection = %self.name,
                error = %err,
                "failed to populate cache"
            );
        }
        Ok(value)
    }

    /// Write path: invalidate the whole collection, then delegate. Precise
    /// invalidation of which cached queries a write affects is not decidable
    /// in general, so the entire backend is cleared.
    async fn write(&self, operation: WriteOperation) -> Result<WriteOutcome> {
        if let Err(err) = self.backend.clear().await {
            tracing::warn!(
                collection = %self.name,
                error = %err,
                "cache invalidation failed before write"
            );
        }
        self.collaborator
            .execute_write(&self.database, &self.name, &operation)
            .await
    }
}
