//! Transaction coordinator and the adapter handed to transaction callbacks.
//!
//! The transaction runs as a single write-queue job: `BEGIN EXCLUSIVE` on the writer
//! connection, the callback with a `TxAdapter` bound to that connection, then `COMMIT`, or
//! `ROLLBACK` when the callback or the commit fails.

use crate::adapter::{Capabilities, DatabaseAdapter};
use crate::config::{CollectionConfig, CollectionRegistry, GlobalConfig};
use crate::error::StoreError;
use crate::model::{Document, DocumentVersion, Status, VersionOptions};
use crate::query::{FindQuery, VersionQuery};
use crate::queue::BoxFuture;
use crate::service::{CrudService, GlobalsService, SoftDeleteService, VersionService};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqliteConnection;
use tokio::sync::Mutex;

/// Same operations as the top-level adapter, run directly on the transaction's connection.
/// Table creation and nested transactions are not available.
pub struct TxAdapter<'c> {
    conn: Mutex<&'c mut SqliteConnection>,
    registry: CollectionRegistry,
}

impl<'c> TxAdapter<'c> {
    pub(crate) fn new(conn: &'c mut SqliteConnection, registry: CollectionRegistry) -> Self {
        TxAdapter {
            conn: Mutex::new(conn),
            registry,
        }
    }

    /// Always `Unsupported`: SQLite has one transaction per connection.
    pub async fn transaction<T, F>(&self, _f: F) -> Result<T, StoreError>
    where
        F: for<'t> FnOnce(TxAdapter<'t>) -> BoxFuture<'t, Result<T, StoreError>> + Send + 'static,
    {
        Err(StoreError::Unsupported("nested transaction"))
    }
}

pub(crate) async fn run_transaction<T, F>(
    conn: &mut SqliteConnection,
    registry: CollectionRegistry,
    f: F,
) -> Result<T, StoreError>
where
    F: for<'t> FnOnce(TxAdapter<'t>) -> BoxFuture<'t, Result<T, StoreError>>,
{
    sqlx::query("BEGIN EXCLUSIVE").execute(&mut *conn).await?;
    tracing::debug!("transaction started");
    let result = f(TxAdapter::new(&mut *conn, registry)).await;
    let outcome = match result {
        Ok(value) => match sqlx::query("COMMIT").execute(&mut *conn).await {
            Ok(_) => {
                tracing::debug!("transaction committed");
                return Ok(value);
            }
            Err(e) => StoreError::from(e),
        },
        Err(e) => e,
    };
    if let Err(rb) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
        tracing::warn!(error = %rb, "rollback failed");
    } else {
        tracing::debug!(error = %outcome, "transaction rolled back");
    }
    Err(outcome)
}

#[async_trait]
impl<'c> DatabaseAdapter for TxAdapter<'c> {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            initialize: false,
            soft_delete: true,
            transactions: false,
        }
    }

    async fn initialize(&self, _collections: &[CollectionConfig]) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("initialize inside a transaction"))
    }

    async fn initialize_globals(&self, _globals: &[GlobalConfig]) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("initialize_globals inside a transaction"))
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        CrudService::find(&mut **conn, &coll, query).await
    }

    async fn count(&self, collection: &str, query: &FindQuery) -> Result<u64, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        CrudService::count(&mut **conn, &coll, query).await
    }

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        CrudService::find_by_id(&mut **conn, &coll, id).await
    }

    async fn create(&self, collection: &str, data: Document) -> Result<Document, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        CrudService::create(&mut **conn, &coll, &data).await
    }

    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<Document, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        CrudService::update(&mut **conn, &coll, id, &patch).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        CrudService::delete(&mut **conn, &coll, id).await
    }

    async fn soft_delete(&self, collection: &str, id: &str, field: Option<&str>) -> Result<bool, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        SoftDeleteService::soft_delete(&mut **conn, &coll, id, field).await
    }

    async fn restore(&self, collection: &str, id: &str, field: Option<&str>) -> Result<Document, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        SoftDeleteService::restore(&mut **conn, &coll, id, field).await
    }

    async fn create_version(
        &self,
        collection: &str,
        parent: &str,
        data: Value,
        opts: VersionOptions,
    ) -> Result<DocumentVersion, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        VersionService::create_version(&mut **conn, &coll, parent, &data, opts).await
    }

    async fn find_versions(
        &self,
        collection: &str,
        parent: &str,
        opts: &VersionQuery,
    ) -> Result<Vec<DocumentVersion>, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        VersionService::find_versions(&mut **conn, &coll, parent, opts).await
    }

    async fn find_version_by_id(&self, collection: &str, id: &str) -> Result<Option<DocumentVersion>, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        VersionService::find_version_by_id(&mut **conn, &coll, id).await
    }

    async fn restore_version(&self, collection: &str, version_id: &str) -> Result<Document, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        VersionService::restore_version(&mut **conn, &coll, version_id).await
    }

    async fn delete_versions(&self, collection: &str, parent: &str, keep_latest: Option<i64>) -> Result<u64, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        VersionService::delete_versions(&mut **conn, &coll, parent, keep_latest).await
    }

    async fn count_versions(&self, collection: &str, parent: &str, opts: &VersionQuery) -> Result<u64, StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        VersionService::count_versions(&mut **conn, &coll, parent, opts).await
    }

    async fn update_status(&self, collection: &str, id: &str, status: Status) -> Result<(), StoreError> {
        let coll = self.registry.get(collection)?;
        let mut conn = self.conn.lock().await;
        VersionService::update_status(&mut **conn, &coll, id, status).await
    }

    async fn find_global(&self, slug: &str) -> Result<Option<Document>, StoreError> {
        let mut conn = self.conn.lock().await;
        GlobalsService::find(&mut **conn, slug).await
    }

    async fn update_global(&self, slug: &str, data: Document) -> Result<Document, StoreError> {
        let mut conn = self.conn.lock().await;
        GlobalsService::update(&mut **conn, slug, &data).await
    }

    async fn has_seed(&self, name: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock().await;
        GlobalsService::has_seed(&mut **conn, name).await
    }

    async fn record_seed(&self, name: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.lock().await;
        GlobalsService::record_seed(&mut **conn, name).await
    }
}
