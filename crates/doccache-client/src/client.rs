//! Client and database handles
//!
//! `CachedClient` owns the pieces shared across all collections: the driver
//! collaborator, the backend registry, the default cache configuration, and
//! the optional `DocumentStore` for store-backed collections.
//! `CachedDatabase` hands out collection handles and guarantees at most one
//! live backend per (database, collection) pair.

use crate::collaborator::QueryCollaborator;
use crate::collection::CachedCollection;
use doccache_backend::{BackendRegistry, DocumentStore};
use doccache_core::{CacheConfig, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

struct ClientInner {
    collaborator: Arc<dyn QueryCollaborator>,
    registry: Arc<BackendRegistry>,
    defaults: CacheConfig,
    store: Option<Arc<dyn DocumentStore>>,
    databases: RwLock<HashMap<String, CachedDatabase>>,
}

/// Entry point of the caching layer.
///
/// Cheap to clone; all clones share the registry and the driver
/// collaborator. Invalid default configuration fails construction rather
/// than surfacing later from some collection.
#[derive(Clone)]
pub struct CachedClient {
    inner: Arc<ClientInner>,
}

impl CachedClient {
    /// Create a client whose collections all use in-process backends
    pub fn new(
        collaborator: Arc<dyn QueryCollaborator>,
        defaults: CacheConfig,
    ) -> Result<Self> {
        Self::build(collaborator, defaults, None)
    }

    /// Create a client that can also serve store-backed collections
    pub fn with_store(
        collaborator: Arc<dyn QueryCollaborator>,
        defaults: CacheConfig,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        Self::build(collaborator, defaults, Some(store))
    }

    fn build(
        collaborator: Arc<dyn QueryCollaborator>,
        defaults: CacheConfig,
        store: Option<Arc<dyn DocumentStore>>,
    ) -> Result<Self> {
        defaults.validate()?;
        Ok(Self {
            inner: Arc::new(ClientInner {
                collaborator,
                registry: Arc::new(BackendRegistry::new()),
                defaults,
                store,
                databases: RwLock::new(HashMap::new()),
            }),
        })
    }

    /// Handle for the named database. Repeated calls return the same handle.
    pub fn database(&self, name: impl Into<String>) -> CachedDatabase {
        let name = name.into();
        if let Some(db) = self.inner.databases.read().get(&name) {
            return db.clone();
        }

        let mut databases = self.inner.databases.write();
        // Double-checked: another caller may have created it between locks.
        if let Some(db) = databases.get(&name) {
            return db.clone();
        }
        let db = CachedDatabase {
            inner: Arc::new(DatabaseInner {
                name: name.clone(),
                client: Arc::clone(&self.inner),
                collections: RwLock::new(HashMap::new()),
            }),
        };
        databases.insert(name, db.clone());
        db
    }

    /// The registry of live backends, shared with the embedding application
    /// for direct invalidation or inspection
    pub fn registry(&self) -> Arc<BackendRegistry> {
        Arc::clone(&self.inner.registry)
    }

    /// The default configuration collections inherit
    pub fn defaults(&self) -> &CacheConfig {
        &self.inner.defaults
    }

    /// Stop every collection's cleanup scheduler and release backend
    /// resources. Store-backed collections clear their persisted entries
    /// here so they cannot go stale for the next process.
    pub async fn shutdown(&self) -> Result<()> {
        let collections: Vec<Arc<CachedCollection>> = {
            let databases = self.inner.databases.read();
            databases
                .values()
                .flat_map(|db| db.inner.collections.read().values().cloned().collect::<Vec<_>>())
                .collect()
        };

        // Teardown happens outside the handle locks.
        let mut first_error = None;
        for collection in collections {
            if let Err(err) = collection.shutdown().await {
                tracing::warn!(
                    collection = collection.name(),
                    error = %err,
                    "collection shutdown failed"
                );
                first_error.get_or_insert(err);
            }
        }

        self.inner.databases.write().clear();
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct DatabaseInner {
    name: String,
    client: Arc<ClientInner>,
    collections: RwLock<HashMap<String, Arc<CachedCollection>>>,
}

/// Handle for one database; hands out cached collection handles.
#[derive(Clone)]
pub struct CachedDatabase {
    inner: Arc<DatabaseInner>,
}

impl CachedDatabase {
    /// Database name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Collection handle using the client's default configuration.
    /// Repeated calls return the same handle, so at most one backend and one
    /// cleanup scheduler exist per (database, collection) pair.
    pub fn collection(&self, name: impl Into<String>) -> Result<Arc<CachedCollection>> {
        let defaults = self.inner.client.defaults.clone();
        self.collection_with_config(name, defaults)
    }

    /// Collection handle with an overriding configuration. The override only
    /// applies when this call creates the handle; an existing handle keeps
    /// the configuration it was created with.
    pub fn collection_with_config(
        &self,
        name: impl Into<String>,
        config: CacheConfig,
    ) -> Result<Arc<CachedCollection>> {
        let name = name.into();
        if let Some(collection) = self.inner.collections.read().get(&name) {
            return Ok(Arc::clone(collection));
        }

        let mut collections = self.inner.collections.write();
        if let Some(collection) = collections.get(&name) {
            return Ok(Arc::clone(collection));
        }

        let collection = Arc::new(CachedCollection::new(
            self.inner.name.clone(),
            name.clone(),
            config,
            Arc::clone(&self.inner.client.collaborator),
            Arc::clone(&self.inner.client.registry),
            self.inner.client.store.clone(),
        )?);
        collections.insert(name, Arc::clone(&collection));
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{ReadQuery, WriteOperation, WriteOutcome};
    use crate::collection::FindOptions;
    use async_trait::async_trait;
    use doccache_backend::MemoryDocumentStore;
    use doccache_core::{BackendKind, CacheError, CachedValue};
    use serde_json::json;

    struct StaticCollaborator;

    #[async_trait]
    impl QueryCollaborator for StaticCollaborator {
        async fn execute_read(
            &self,
            _database: &str,
            _collection: &str,
            query: &ReadQuery,
        ) -> Result<CachedValue> {
            match query.kind {
                doccache_core::OperationKind::FindOne => {
                    Ok(CachedValue::Single(Some(json!({"ok": true}))))
                }
                _ => Ok(CachedValue::Many(vec![json!({"ok": true})])),
            }
        }

        async fn execute_write(
            &self,
            _database: &str,
            _collection: &str,
            _operation: &WriteOperation,
        ) -> Result<WriteOutcome> {
            Ok(WriteOutcome::default())
        }
    }

    fn client() -> CachedClient {
        CachedClient::new(
            Arc::new(StaticCollaborator),
            CacheConfig::default().with_cleanup_cycle(None),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_collection_handles_are_shared() {
        let client = client();
        let db = client.database("app");

        let a = db.collection("stocks").unwrap();
        let b = db.collection("stocks").unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        // One registry entry per (database, collection) pair.
        assert_eq!(client.registry().len(), 1);
        db.collection("orders").unwrap();
        assert_eq!(client.registry().len(), 2);
    }

    #[tokio::test]
    async fn test_database_handles_are_shared() {
        let client = client();
        let a = client.database("app");
        let b = client.database("app");
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
        assert_ne!(client.database("other").name(), a.name());
    }

    #[tokio::test]
    async fn test_same_collection_name_in_two_databases() {
        let client = client();
        let a = client.database("app").collection("stocks").unwrap();
        let b = client.database("analytics").collection("stocks").unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(client.registry().len(), 2);
        assert!(client.registry().lookup("app", "stocks").is_some());
        assert!(client.registry().lookup("analytics", "stocks").is_some());
    }

    #[tokio::test]
    async fn test_invalid_defaults_rejected_at_construction() {
        let result = CachedClient::new(
            Arc::new(StaticCollaborator),
            CacheConfig::default().with_max_items(0),
        );
        assert!(matches!(result, Err(CacheError::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_per_collection_config_override() {
        let client = client();
        let db = client.database("app");
        let config = client
            .defaults()
            .clone()
            .with_ttl_seconds(30)
            .with_max_items(5);

        let stocks = db.collection_with_config("stocks", config).unwrap();
        assert_eq!(stocks.backend().ttl_seconds(), 30);
        assert_eq!(stocks.backend().max_items(), 5);

        // The plain accessor returns the existing handle, override intact.
        let again = db.collection("stocks").unwrap();
        assert_eq!(again.backend().max_items(), 5);
    }

    #[tokio::test]
    async fn test_shutdown_deregisters_everything() {
        let client = client();
        let db = client.database("app");
        db.collection("stocks").unwrap();
        db.collection("orders").unwrap();
        assert_eq!(client.registry().len(), 2);

        client.shutdown().await.unwrap();
        assert!(client.registry().is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_clears_persisted_store() {
        let store = Arc::new(MemoryDocumentStore::new());
        let client = CachedClient::with_store(
            Arc::new(StaticCollaborator),
            CacheConfig::default()
                .with_backend(BackendKind::Store)
                .with_cleanup_cycle(None),
            store.clone(),
        )
        .unwrap();

        let stocks = client.database("app").collection("stocks").unwrap();
        stocks.find_one(None, FindOptions::default()).await.unwrap();
        assert_eq!(store.len(), 1);

        client.shutdown().await.unwrap();
        assert!(store.is_empty());
    }
}
