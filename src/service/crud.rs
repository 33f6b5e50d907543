//! Generic CRUD execution against SQLite.
//!
//! Every function takes the connection to run on: a pooled reader for reads, the write
//! queue's connection for writes, or the open transaction's connection.

use crate::codec::{decode, row_to_json};
use crate::config::ResolvedCollection;
use crate::error::StoreError;
use crate::model::{new_id, now, Document};
use crate::query::FindQuery;
use crate::sql::{self, QueryBuf};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::SqliteConnection;

pub struct CrudService;

impl CrudService {
    /// Rows matching the query's conditions, paginated (default 100 per page, `limit = 0` for all).
    pub async fn find(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        query: &FindQuery,
    ) -> Result<Vec<Document>, StoreError> {
        let q = sql::select_list(coll, query)?;
        let rows = Self::query_many(conn, &q).await?;
        Ok(rows.iter().map(|r| Self::decode_row(coll, r)).collect())
    }

    /// Number of rows matching the query's conditions; pagination is ignored.
    pub async fn count(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        query: &FindQuery,
    ) -> Result<u64, StoreError> {
        let q = sql::count(coll, query)?;
        Self::query_count(conn, &q).await
    }

    pub async fn find_by_id(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let q = sql::select_by_id(coll, id);
        let row = Self::query_optional(conn, &q).await?;
        Ok(row.map(|r| Self::decode_row(coll, &r)))
    }

    /// Insert one row. `id`, `createdAt` and `updatedAt` are assigned here and override whatever
    /// the caller sent; keys that are not columns of the collection are dropped.
    pub async fn create(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        data: &Document,
    ) -> Result<Document, StoreError> {
        let mut body = data.clone();
        let ts = now();
        body.insert("id".into(), Value::String(new_id()));
        body.insert("createdAt".into(), Value::String(ts.clone()));
        body.insert("updatedAt".into(), Value::String(ts));
        let q = sql::insert(coll, &body);
        let row = Self::query_optional(conn, &q)
            .await?
            .ok_or(StoreError::Db(sqlx::Error::RowNotFound))?;
        Ok(Self::decode_row(coll, &row))
    }

    /// Partial update by id; `id` and `createdAt` in the patch are ignored. Returns the full row.
    /// A missing id is `NotFound`.
    pub async fn update(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        id: &str,
        patch: &Document,
    ) -> Result<Document, StoreError> {
        let mut body = patch.clone();
        body.remove("id");
        body.remove("createdAt");
        body.insert("updatedAt".into(), Value::String(now()));
        let q = sql::update(coll, id, &body);
        if Self::execute(conn, &q).await? == 0 {
            return Err(StoreError::not_found(&coll.slug, id));
        }
        Self::find_by_id(conn, coll, id)
            .await?
            .ok_or_else(|| StoreError::not_found(&coll.slug, id))
    }

    /// Delete by id. True iff a row was removed; versions go with it (ON DELETE CASCADE).
    pub async fn delete(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        id: &str,
    ) -> Result<bool, StoreError> {
        let q = sql::delete(coll, id);
        Ok(Self::execute(conn, &q).await? > 0)
    }

    /// Row as a document, each column decoded by its declared kind.
    pub(crate) fn decode_row(coll: &ResolvedCollection, row: &SqliteRow) -> Document {
        row_to_json(row)
            .into_iter()
            .map(|(name, raw)| {
                let value = match coll.column(&name) {
                    Some(c) => decode(raw, c.kind),
                    None => raw,
                };
                (name, value)
            })
            .collect()
    }

    pub(crate) async fn query_many(conn: &mut SqliteConnection, q: &QueryBuf) -> Result<Vec<SqliteRow>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_all(&mut *conn).await?)
    }

    pub(crate) async fn query_optional(conn: &mut SqliteConnection, q: &QueryBuf) -> Result<Option<SqliteRow>, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.fetch_optional(&mut *conn).await?)
    }

    /// Run a statement; returns rows affected.
    pub(crate) async fn execute(conn: &mut SqliteConnection, q: &QueryBuf) -> Result<u64, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        Ok(query.execute(&mut *conn).await?.rows_affected())
    }

    pub(crate) async fn query_count(conn: &mut SqliteConnection, q: &QueryBuf) -> Result<u64, StoreError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        let n = query.fetch_one(&mut *conn).await?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}
