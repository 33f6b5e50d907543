//! SQLite adapter: a WAL-mode reader pool for reads, one writer connection behind the write
//! queue for everything that mutates, and the registry of initialized collections.

use crate::adapter::{Capabilities, DatabaseAdapter};
use crate::config::{
    resolve, validate_collections, validate_globals, CollectionConfig, CollectionRegistry, GlobalConfig,
    ResolvedCollection, StoreOptions,
};
use crate::error::StoreError;
use crate::migration::{apply_collections, apply_globals};
use crate::model::{Document, DocumentVersion, Status, VersionOptions};
use crate::query::{FindQuery, VersionQuery};
use crate::queue::{BoxFuture, WriteQueue};
use crate::service::{CrudService, GlobalsService, SoftDeleteService, VersionService};
use crate::transaction::{run_transaction, TxAdapter};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{Sqlite, SqlitePool, SqlitePoolOptions};
use sqlx::{Connection, SqliteConnection};

pub struct SqliteAdapter {
    readers: SqlitePool,
    queue: WriteQueue,
    registry: CollectionRegistry,
}

impl SqliteAdapter {
    /// Open the writer connection (creating the file and switching it to WAL), then the reader pool.
    pub async fn connect(options: &StoreOptions) -> Result<Self, StoreError> {
        let connect = options.connect_options()?;
        let writer = SqliteConnection::connect_with(&connect).await?;
        let readers = SqlitePoolOptions::new()
            .max_connections(options.max_readers)
            .connect_with(connect)
            .await?;
        tracing::info!(url = %options.database_url, max_readers = options.max_readers, "sqlite adapter connected");
        Ok(SqliteAdapter {
            readers,
            queue: WriteQueue::spawn(writer),
            registry: CollectionRegistry::new(),
        })
    }

    /// `connect` with options read from the environment.
    pub async fn from_env() -> Result<Self, StoreError> {
        Self::connect(&StoreOptions::from_env()?).await
    }

    pub fn registry(&self) -> &CollectionRegistry {
        &self.registry
    }

    /// Writes admitted to the queue and not yet finished.
    pub fn pending_writes(&self) -> usize {
        self.queue.pending()
    }

    /// Run `f` as one exclusive transaction, serialized with all other writes. Commits when
    /// `f` returns `Ok`; rolls back and returns the error otherwise.
    pub async fn transaction<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: for<'t> FnOnce(TxAdapter<'t>) -> BoxFuture<'t, Result<T, StoreError>> + Send + 'static,
    {
        let registry = self.registry.clone();
        self.queue
            .submit(move |conn| Box::pin(run_transaction(conn, registry, f)))
            .await
    }

    async fn reader(&self) -> Result<PoolConnection<Sqlite>, StoreError> {
        Ok(self.readers.acquire().await?)
    }

    fn collection(&self, slug: &str) -> Result<std::sync::Arc<ResolvedCollection>, StoreError> {
        self.registry.get(slug)
    }
}

#[async_trait]
impl DatabaseAdapter for SqliteAdapter {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            initialize: true,
            soft_delete: true,
            transactions: true,
        }
    }

    async fn initialize(&self, collections: &[CollectionConfig]) -> Result<(), StoreError> {
        validate_collections(collections)?;
        let resolved = collections.iter().map(resolve).collect::<Result<Vec<_>, _>>()?;
        let resolved = self
            .queue
            .submit(move |conn| {
                Box::pin(async move {
                    apply_collections(conn, &resolved).await?;
                    Ok(resolved)
                })
            })
            .await?;
        for coll in resolved {
            self.registry.register(coll);
        }
        Ok(())
    }

    async fn initialize_globals(&self, globals: &[GlobalConfig]) -> Result<(), StoreError> {
        validate_globals(globals)?;
        self.queue.submit(|conn| Box::pin(apply_globals(conn))).await?;
        tracing::info!(globals = globals.len(), "globals ready");
        Ok(())
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let coll = self.collection(collection)?;
        let mut conn = self.reader().await?;
        CrudService::find(&mut conn, &coll, query).await
    }

    async fn count(&self, collection: &str, query: &FindQuery) -> Result<u64, StoreError> {
        let coll = self.collection(collection)?;
        let mut conn = self.reader().await?;
        CrudService::count(&mut conn, &coll, query).await
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let coll = self.collection(collection)?;
        let mut conn = self.reader().await?;
        CrudService::find_by_id(&mut conn, &coll, id).await
    }

    async fn create(&self, collection: &str, data: Document) -> Result<Document, StoreError> {
        let coll = self.collection(collection)?;
        self.queue
            .submit(move |conn| Box::pin(async move { CrudService::create(conn, &coll, &data).await }))
            .await
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<Document, StoreError> {
        let coll = self.collection(collection)?;
        let id = id.to_string();
        self.queue
            .submit(move |conn| Box::pin(async move { CrudService::update(conn, &coll, &id, &patch).await }))
            .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let coll = self.collection(collection)?;
        let id = id.to_string();
        self.queue
            .submit(move |conn| Box::pin(async move { CrudService::delete(conn, &coll, &id).await }))
            .await
    }

    async fn soft_delete(&self, collection: &str, id: &str, field: Option<&str>) -> Result<bool, StoreError> {
        let coll = self.collection(collection)?;
        let id = id.to_string();
        let field = field.map(str::to_string);
        self.queue
            .submit(move |conn| {
                Box::pin(async move { SoftDeleteService::soft_delete(conn, &coll, &id, field.as_deref()).await })
            })
            .await
    }

    async fn restore(&self, collection: &str, id: &str, field: Option<&str>) -> Result<Document, StoreError> {
        let coll = self.collection(collection)?;
        let id = id.to_string();
        let field = field.map(str::to_string);
        self.queue
            .submit(move |conn| {
                Box::pin(async move { SoftDeleteService::restore(conn, &coll, &id, field.as_deref()).await })
            })
            .await
    }

    async fn create_version(
        &self,
        collection: &str,
        parent: &str,
        data: Value,
        opts: VersionOptions,
    ) -> Result<DocumentVersion, StoreError> {
        let coll = self.collection(collection)?;
        if !coll.versions {
            return Err(StoreError::VersioningNotEnabled(coll.slug.clone()));
        }
        let parent = parent.to_string();
        self.queue
            .submit(move |conn| {
                Box::pin(async move { VersionService::create_version(conn, &coll, &parent, &data, opts).await })
            })
            .await
    }

    async fn find_versions(
        &self,
        collection: &str,
        parent: &str,
        opts: &VersionQuery,
    ) -> Result<Vec<DocumentVersion>, StoreError> {
        let coll = self.collection(collection)?;
        let mut conn = self.reader().await?;
        VersionService::find_versions(&mut conn, &coll, parent, opts).await
    }

    async fn find_version_by_id(&self, collection: &str, id: &str) -> Result<Option<DocumentVersion>, StoreError> {
        let coll = self.collection(collection)?;
        let mut conn = self.reader().await?;
        VersionService::find_version_by_id(&mut conn, &coll, id).await
    }

    async fn restore_version(&self, collection: &str, version_id: &str) -> Result<Document, StoreError> {
        let coll = self.collection(collection)?;
        if !coll.versions {
            return Err(StoreError::VersioningNotEnabled(coll.slug.clone()));
        }
        let version_id = version_id.to_string();
        self.queue
            .submit(move |conn| {
                Box::pin(async move { VersionService::restore_version(conn, &coll, &version_id).await })
            })
            .await
    }

    async fn delete_versions(&self, collection: &str, parent: &str, keep_latest: Option<i64>) -> Result<u64, StoreError> {
        let coll = self.collection(collection)?;
        if !coll.versions {
            return Err(StoreError::VersioningNotEnabled(coll.slug.clone()));
        }
        let parent = parent.to_string();
        self.queue
            .submit(move |conn| {
                Box::pin(async move { VersionService::delete_versions(conn, &coll, &parent, keep_latest).await })
            })
            .await
    }

    async fn count_versions(&self, collection: &str, parent: &str, opts: &VersionQuery) -> Result<u64, StoreError> {
        let coll = self.collection(collection)?;
        let mut conn = self.reader().await?;
        VersionService::count_versions(&mut conn, &coll, parent, opts).await
    }

    async fn update_status(&self, collection: &str, id: &str, status: Status) -> Result<(), StoreError> {
        let coll = self.collection(collection)?;
        if !coll.drafts {
            return Err(StoreError::VersioningNotEnabled(coll.slug.clone()));
        }
        let id = id.to_string();
        self.queue
            .submit(move |conn| {
                Box::pin(async move { VersionService::update_status(conn, &coll, &id, status).await })
            })
            .await
    }

    async fn find_global(&self, slug: &str) -> Result<Option<Document>, StoreError> {
        let mut conn = self.reader().await?;
        GlobalsService::find(&mut conn, slug).await
    }

    async fn update_global(&self, slug: &str, data: Document) -> Result<Document, StoreError> {
        let slug = slug.to_string();
        self.queue
            .submit(move |conn| Box::pin(async move { GlobalsService::update(conn, &slug, &data).await }))
            .await
    }

    async fn has_seed(&self, name: &str) -> Result<bool, StoreError> {
        let mut conn = self.reader().await?;
        GlobalsService::has_seed(&mut conn, name).await
    }

    async fn record_seed(&self, name: &str) -> Result<(), StoreError> {
        let name = name.to_string();
        self.queue
            .submit(move |conn| Box::pin(async move { GlobalsService::record_seed(conn, &name).await }))
            .await
    }

    /// Drain queued writes, close the writer, then the reader pool.
    async fn close(&self) -> Result<(), StoreError> {
        self.queue.shutdown().await?;
        self.readers.close().await;
        tracing::info!("sqlite adapter closed");
        Ok(())
    }
}
