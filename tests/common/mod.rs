//! Shared fixtures: a store on a fresh temp-dir database and the collections the tests use.

#![allow(dead_code)]

use serde_json::Value;
use sqlx::sqlite::SqlitePool;
use tempfile::TempDir;
use vellum::{
    CollectionConfig, DatabaseAdapter, Document, FieldConfig, FieldKind, IndexConfig, SoftDeleteConfig, SqliteAdapter,
    StoreOptions,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::new("vellum=debug"))
        .try_init();
}

/// Store on `<tempdir>/store.db`. Keep the `TempDir` alive for the test's duration.
pub async fn open_store() -> (SqliteAdapter, TempDir) {
    init_tracing();
    let dir = TempDir::new().expect("temp dir");
    let store = SqliteAdapter::connect(&StoreOptions::for_path(&dir.path().join("store.db")))
        .await
        .expect("connect");
    (store, dir)
}

/// Store with `posts`, `tags` and `media` initialized, plus globals.
pub async fn open_initialized() -> (SqliteAdapter, TempDir) {
    let (store, dir) = open_store().await;
    store.initialize(&[posts(), tags(), media()]).await.expect("initialize");
    store.initialize_globals(&[vellum::GlobalConfig::new("site-settings")]).await.expect("globals");
    (store, dir)
}

/// Versioned with drafts, soft delete on `deletedAt`.
pub fn posts() -> CollectionConfig {
    CollectionConfig::new("posts")
        .versions(true)
        .soft_delete(SoftDeleteConfig::Enabled)
        .field(FieldConfig::new("title", FieldKind::Text).required())
        .field(FieldConfig::new("views", FieldKind::Number))
        .field(FieldConfig::new("featured", FieldKind::Boolean))
        .field(FieldConfig::new("meta", FieldKind::Group))
        .field(FieldConfig::new("tags", FieldKind::Array))
        .field(FieldConfig::new("body", FieldKind::Json))
        .field(FieldConfig::new("author", FieldKind::Relationship))
        .field(FieldConfig::new("publishOn", FieldKind::Date))
        .index(IndexConfig {
            columns: vec!["title".into()],
            unique: false,
            name: None,
        })
}

/// Plain collection: no versions, no soft delete.
pub fn tags() -> CollectionConfig {
    CollectionConfig::new("tags").field(FieldConfig::new("name", FieldKind::Text).required())
}

/// Versions without drafts, custom marker, renamed table.
pub fn media() -> CollectionConfig {
    CollectionConfig::new("media")
        .db_name("media_items")
        .versions(false)
        .soft_delete(SoftDeleteConfig::Field("trashedAt".into()))
        .field(FieldConfig::new("filename", FieldKind::Text).required())
        .field(FieldConfig::new("size", FieldKind::Number))
}

pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {}", other),
    }
}

pub fn id_of(doc: &Document) -> String {
    doc["id"].as_str().expect("id").to_string()
}

/// Table and index names in the database file, sorted.
pub async fn schema_objects(dir: &TempDir) -> Vec<(String, String)> {
    let opts = StoreOptions::for_path(&dir.path().join("store.db")).connect_options().expect("options");
    let pool = SqlitePool::connect_with(opts).await.expect("pool");
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT type, name FROM sqlite_master WHERE name NOT LIKE 'sqlite_%' ORDER BY type, name")
            .fetch_all(&pool)
            .await
            .expect("sqlite_master");
    pool.close().await;
    rows
}
