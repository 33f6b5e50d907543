//! The operation set every storage adapter exposes.
//!
//! Optional operations have default bodies returning `Unsupported`; check `capabilities()`
//! before relying on them. `transaction` is generic and lives on the concrete adapter.

use crate::config::{CollectionConfig, GlobalConfig};
use crate::error::StoreError;
use crate::model::{Document, DocumentVersion, Status, VersionOptions};
use crate::query::{FindQuery, VersionQuery};
use async_trait::async_trait;
use serde_json::Value;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// `initialize` / `initialize_globals` create tables.
    pub initialize: bool,
    pub soft_delete: bool,
    /// `transaction` can be started from this adapter.
    pub transactions: bool,
}

#[async_trait]
pub trait DatabaseAdapter: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    /// Validate, compile and create tables for `collections`, then register them.
    async fn initialize(&self, _collections: &[CollectionConfig]) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("initialize"))
    }

    async fn initialize_globals(&self, _globals: &[GlobalConfig]) -> Result<(), StoreError> {
        Err(StoreError::Unsupported("initialize_globals"))
    }

    async fn find(&self, collection: &str, query: &FindQuery) -> Result<Vec<Document>, StoreError>;

    async fn count(&self, collection: &str, query: &FindQuery) -> Result<u64, StoreError>;

    async fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn create(&self, collection: &str, data: Document) -> Result<Document, StoreError>;

    /// Fails with `NotFound` when `id` does not exist.
    async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<Document, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;

    async fn soft_delete(&self, _collection: &str, _id: &str, _field: Option<&str>) -> Result<bool, StoreError> {
        Err(StoreError::Unsupported("soft_delete"))
    }

    async fn restore(&self, _collection: &str, _id: &str, _field: Option<&str>) -> Result<Document, StoreError> {
        Err(StoreError::Unsupported("restore"))
    }

    async fn create_version(
        &self,
        collection: &str,
        parent: &str,
        data: Value,
        opts: VersionOptions,
    ) -> Result<DocumentVersion, StoreError>;

    async fn find_versions(
        &self,
        collection: &str,
        parent: &str,
        opts: &VersionQuery,
    ) -> Result<Vec<DocumentVersion>, StoreError>;

    async fn find_version_by_id(&self, collection: &str, id: &str) -> Result<Option<DocumentVersion>, StoreError>;

    /// Fails with `VersionNotFound` when `version_id` does not exist.
    async fn restore_version(&self, collection: &str, version_id: &str) -> Result<Document, StoreError>;

    async fn delete_versions(&self, collection: &str, parent: &str, keep_latest: Option<i64>) -> Result<u64, StoreError>;

    async fn count_versions(&self, collection: &str, parent: &str, opts: &VersionQuery) -> Result<u64, StoreError>;

    async fn update_status(&self, collection: &str, id: &str, status: Status) -> Result<(), StoreError>;

    async fn find_global(&self, slug: &str) -> Result<Option<Document>, StoreError>;

    async fn update_global(&self, slug: &str, data: Document) -> Result<Document, StoreError>;

    async fn has_seed(&self, name: &str) -> Result<bool, StoreError>;

    async fn record_seed(&self, name: &str) -> Result<(), StoreError>;

    /// Release connections. Later calls fail.
    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
