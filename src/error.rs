//! Typed errors for config loading and storage operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("duplicate collection: {0}")]
    DuplicateCollection(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("invalid {kind} identifier: '{name}'")]
    InvalidIdentifier { kind: &'static str, name: String },
    #[error("unknown collection: {0}")]
    UnknownCollection(String),
    #[error("not found: {collection} id '{id}'")]
    NotFound { collection: String, id: String },
    #[error("version not found: {collection} version '{id}'")]
    VersionNotFound { collection: String, id: String },
    #[error("versioning not enabled for collection: {0}")]
    VersioningNotEnabled(String),
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("operation not supported by this adapter: {0}")]
    Unsupported(&'static str),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("write queue closed")]
    QueueClosed,
    /// The write job panicked; its writes were rolled back and the queue keeps running.
    #[error("write job panicked")]
    JobPanicked,
}

impl StoreError {
    pub(crate) fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub(crate) fn version_not_found(collection: &str, id: &str) -> Self {
        StoreError::VersionNotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// True for the two "row does not exist" variants.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. } | StoreError::VersionNotFound { .. })
    }
}
