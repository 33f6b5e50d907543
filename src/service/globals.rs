//! Singleton documents keyed by slug, stored as JSON in `_sys_globals`, plus the seed ledger.

use crate::codec::decode_json_text;
use crate::config::validate_table_name;
use crate::error::StoreError;
use crate::model::{now, Document};
use crate::service::CrudService;
use crate::sql::globals;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

/// Keys the store owns; stripped from caller data before it is persisted.
const GLOBAL_META_KEYS: &[&str] = &["slug", "createdAt", "updatedAt"];

pub struct GlobalsService;

impl GlobalsService {
    /// Stored data merged with `slug`, `createdAt`, `updatedAt`; `None` if never written.
    pub async fn find(conn: &mut SqliteConnection, slug: &str) -> Result<Option<Document>, StoreError> {
        validate_table_name(slug)?;
        let q = globals::select_global(slug);
        CrudService::query_optional(conn, &q)
            .await?
            .as_ref()
            .map(merge_row)
            .transpose()
    }

    /// Insert or overwrite in one statement; returns the merged stored document.
    pub async fn update(conn: &mut SqliteConnection, slug: &str, data: &Document) -> Result<Document, StoreError> {
        validate_table_name(slug)?;
        let mut stored = data.clone();
        for key in GLOBAL_META_KEYS {
            stored.remove(*key);
        }
        let q = globals::upsert_global(slug, Value::Object(stored).to_string(), &now());
        let row = CrudService::query_optional(conn, &q)
            .await?
            .ok_or(StoreError::Db(sqlx::Error::RowNotFound))?;
        merge_row(&row)
    }

    pub async fn has_seed(conn: &mut SqliteConnection, name: &str) -> Result<bool, StoreError> {
        let q = globals::select_seed(name);
        Ok(CrudService::query_count(conn, &q).await? > 0)
    }

    /// Mark a seed as applied. Recording the same name twice is a no-op.
    pub async fn record_seed(conn: &mut SqliteConnection, name: &str) -> Result<(), StoreError> {
        let q = globals::insert_seed(name, &now());
        CrudService::execute(conn, &q).await?;
        Ok(())
    }
}

fn merge_row(row: &SqliteRow) -> Result<Document, StoreError> {
    let raw: String = row.try_get("data")?;
    let mut doc = match decode_json_text(&raw) {
        Value::Object(map) => map,
        _ => Document::new(),
    };
    doc.insert("slug".into(), Value::String(row.try_get("slug")?));
    doc.insert("createdAt".into(), Value::String(row.try_get("createdAt")?));
    doc.insert("updatedAt".into(), Value::String(row.try_get("updatedAt")?));
    Ok(doc)
}
