//! Example consumer: a separate Rust project that uses vellum as a dependency.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Or from this directory: `cargo run`
//!
//! Reads `VELLUM_DATABASE_URL` (default `sqlite://vellum.db`) and `VELLUM_CONFIG`
//! (default `collections.json` next to this crate's manifest).

use serde_json::json;
use std::path::PathBuf;
use vellum::{
    load_from_path, DatabaseAdapter, Document, FindQuery, SqliteAdapter, Status, StoreError, VersionOptions,
    VersionQuery,
};

fn doc(value: serde_json::Value) -> Document {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Document::new(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("vellum=info,example_consumer=info")),
        )
        .init();

    let config_path = std::env::var("VELLUM_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("collections.json"));
    let config = load_from_path(&config_path)?;

    let store = SqliteAdapter::from_env().await?;
    store.initialize(&config.collections).await?;
    store.initialize_globals(&config.globals).await?;

    if !store.has_seed("welcome-post").await? {
        let post = store
            .create("posts", doc(json!({ "title": "Hello", "tags": ["intro"], "featured": true })))
            .await?;
        let id = post["id"].as_str().unwrap_or_default().to_string();
        store
            .create_version("posts", &id, json!(post.clone()), VersionOptions::default())
            .await?;

        let edited = store.update("posts", &id, doc(json!({ "title": "Hello, world" }))).await?;
        store
            .create_version("posts", &id, json!(edited), VersionOptions::published())
            .await?;
        store.update_status("posts", &id, Status::Published).await?;
        store.record_seed("welcome-post").await?;
        tracing::info!(id = %id, "seeded welcome post");
    }

    let published = store
        .find("posts", &FindQuery::new().where_eq("_status", "published").where_null("deletedAt"))
        .await?;
    for post in &published {
        let id = post["id"].as_str().unwrap_or_default();
        let history = store.find_versions("posts", id, &VersionQuery::default()).await?;
        tracing::info!(id = %id, title = %post["title"], versions = history.len(), "published post");
    }

    let settings = store
        .update_global("site-settings", doc(json!({ "siteName": "Vellum demo", "postsPerPage": 10 })))
        .await?;
    tracing::info!(settings = %serde_json::Value::Object(settings), "site settings");

    // A failing transaction leaves nothing behind.
    let outcome = store
        .transaction(|tx| {
            Box::pin(async move {
                tx.create("media", doc(json!({ "filename": "draft.png", "size": 1024 }))).await?;
                Err::<(), _>(StoreError::InvalidFilter("abandoned upload".into()))
            })
        })
        .await;
    let media = store.count("media", &FindQuery::new().where_eq("filename", "draft.png")).await?;
    tracing::info!(error = ?outcome.err(), rows = media, "transaction rolled back");

    store.close().await?;
    Ok(())
}
