//! Vellum: versioned document storage on SQLite.
//!
//! Collections declared in code or JSON become tables; documents get CRUD with a small filter
//! language, draft/publish versioning, soft delete and singleton globals. All writes go through
//! one serialized writer; reads use a WAL reader pool.

pub mod adapter;
pub mod codec;
pub mod config;
pub mod error;
pub mod migration;
pub mod model;
pub mod query;
pub mod queue;
pub mod service;
pub mod sql;
pub mod store;
pub mod transaction;

pub use adapter::{Capabilities, DatabaseAdapter};
pub use config::{
    load_from_path, load_from_str, resolve, CollectionConfig, CollectionRegistry, FieldConfig, FieldKind, FullConfig,
    GlobalConfig, IndexConfig, ResolvedCollection, SoftDeleteConfig, StoreOptions, VersionsConfig,
};
pub use error::{ConfigError, StoreError};
pub use model::{Document, DocumentVersion, Status, VersionOptions};
pub use query::{FindQuery, SortOrder, VersionQuery};
pub use queue::BoxFuture;
pub use store::SqliteAdapter;
pub use transaction::TxAdapter;
