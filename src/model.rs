//! Documents, versions and publish status.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A physical row as a JSON object: `id`, `createdAt`, `updatedAt`, field columns and,
/// depending on the collection, `_status` and the soft-delete marker.
pub type Document = Map<String, Value>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Draft,
    Published,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Published => "published",
        }
    }
}

impl std::str::FromStr for Status {
    type Err = crate::error::StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Status::Draft),
            "published" => Ok(Status::Published),
            _ => Err(crate::error::StoreError::InvalidFilter(format!(
                "invalid status: {} (expected draft or published)",
                s
            ))),
        }
    }
}

/// Snapshot of a document's field values, linked to its parent. Never updated in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentVersion {
    pub id: String,
    pub parent: String,
    /// Snapshot as written by the caller; opaque to the engine.
    pub version: Value,
    #[serde(rename = "_status")]
    pub status: Status,
    pub autosave: bool,
    pub published_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Options for `create_version`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VersionOptions {
    pub status: Status,
    pub autosave: bool,
}

impl VersionOptions {
    pub fn published() -> Self {
        VersionOptions {
            status: Status::Published,
            autosave: false,
        }
    }

    pub fn autosave() -> Self {
        VersionOptions {
            status: Status::Draft,
            autosave: true,
        }
    }
}

/// Server timestamp: RFC 3339 UTC with microseconds, so lexical order matches time order.
pub fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Random document / version id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
