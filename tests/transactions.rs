//! Transaction atomicity and the transaction-scoped adapter.

mod common;

use common::{doc, id_of, open_initialized};
use pretty_assertions::assert_eq;
use serde_json::json;
use vellum::{DatabaseAdapter, FindQuery, Status, StoreError, VersionOptions, VersionQuery};

#[tokio::test]
async fn test_failed_callback_rolls_back() {
    let (store, _dir) = open_initialized().await;
    let err = store
        .transaction(|tx| {
            Box::pin(async move {
                tx.create("posts", doc(json!({ "title": "A" }))).await?;
                Err::<(), _>(StoreError::InvalidFilter("boom".into()))
            })
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidFilter(_)));
    assert_eq!(store.count("posts", &FindQuery::new()).await.unwrap(), 0);

    // the writer is usable again afterwards
    store.create("posts", doc(json!({ "title": "B" }))).await.unwrap();
    assert_eq!(store.count("posts", &FindQuery::new()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_failed_statement_rolls_back_earlier_writes() {
    let (store, _dir) = open_initialized().await;
    let err = store
        .transaction(|tx| {
            Box::pin(async move {
                tx.create("tags", doc(json!({ "name": "kept?" }))).await?;
                tx.update_global("site-settings", doc(json!({ "siteName": "x" }))).await?;
                // NOT NULL violation on `title`
                tx.create("posts", doc(json!({ "views": 1 }))).await?;
                Ok(())
            })
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Db(_)));
    assert_eq!(store.count("tags", &FindQuery::new()).await.unwrap(), 0);
    assert!(store.find_global("site-settings").await.unwrap().is_none());
}

#[tokio::test]
async fn test_commit_makes_all_writes_visible() {
    let (store, _dir) = open_initialized().await;
    let id = store
        .transaction(|tx| {
            Box::pin(async move {
                let post = tx.create("posts", doc(json!({ "title": "draft" }))).await?;
                let id = id_of(&post);
                // reads inside the transaction see its own writes
                assert!(tx.find_by_id("posts", &id).await?.is_some());
                tx.create_version("posts", &id, json!({ "title": "draft" }), VersionOptions::published())
                    .await?;
                tx.update_status("posts", &id, Status::Published).await?;
                Ok(id)
            })
        })
        .await
        .unwrap();

    let post = store.find_by_id("posts", &id).await.unwrap().unwrap();
    assert_eq!(post["_status"], json!("published"));
    assert_eq!(store.count_versions("posts", &id, &VersionQuery::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_restore_version_inside_transaction() {
    let (store, _dir) = open_initialized().await;
    let post = store.create("posts", doc(json!({ "title": "v1" }))).await.unwrap();
    let id = id_of(&post);
    let v1 = store
        .create_version("posts", &id, json!({ "title": "v1" }), VersionOptions::default())
        .await
        .unwrap();
    store.update("posts", &id, doc(json!({ "title": "v2" }))).await.unwrap();

    let version_id = v1.id.clone();
    let err = store
        .transaction(move |tx| {
            Box::pin(async move {
                tx.restore_version("posts", &version_id).await?;
                Err::<(), _>(StoreError::InvalidFilter("undo".into()))
            })
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidFilter(_)));
    let post = store.find_by_id("posts", &id).await.unwrap().unwrap();
    assert_eq!(post["title"], json!("v2"));
    assert_eq!(store.count_versions("posts", &id, &VersionQuery::default()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_transaction_adapter_capabilities() {
    let (store, _dir) = open_initialized().await;
    assert!(store.capabilities().transactions);
    store
        .transaction(|tx| {
            Box::pin(async move {
                let caps = tx.capabilities();
                assert!(!caps.initialize);
                assert!(!caps.transactions);
                assert!(caps.soft_delete);
                assert!(matches!(tx.initialize(&[]).await, Err(StoreError::Unsupported(_))));
                assert!(matches!(tx.initialize_globals(&[]).await, Err(StoreError::Unsupported(_))));
                let nested = tx.transaction(|_inner| Box::pin(async move { Ok(()) })).await;
                assert!(matches!(nested, Err(StoreError::Unsupported(_))));
                Ok(())
            })
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_panicking_callback_is_rolled_back_and_isolated() {
    let (store, _dir) = open_initialized().await;
    let err = store
        .transaction(|tx| {
            Box::pin(async move {
                tx.create("tags", doc(json!({ "name": "half-done" }))).await?;
                let empty: Vec<usize> = Vec::new();
                Ok(empty[0])
            })
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::JobPanicked));
    assert_eq!(store.count("tags", &FindQuery::new()).await.unwrap(), 0);

    // the writer survived and commits again
    store.create("tags", doc(json!({ "name": "after" }))).await.unwrap();
    assert_eq!(store.count("tags", &FindQuery::new()).await.unwrap(), 1);
    assert_eq!(store.pending_writes(), 0);
}
