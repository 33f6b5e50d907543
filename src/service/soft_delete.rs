//! Soft delete: a nullable timestamp marker column instead of removing the row.

use crate::config::{ResolvedCollection, DEFAULT_SOFT_DELETE_FIELD};
use crate::error::StoreError;
use crate::model::{now, Document};
use crate::service::CrudService;
use crate::sql::{self, SqliteBindValue};
use sqlx::SqliteConnection;

pub struct SoftDeleteService;

impl SoftDeleteService {
    /// Explicit field, else the collection's configured marker, else `deletedAt`.
    pub fn marker<'a>(coll: &'a ResolvedCollection, field: Option<&'a str>) -> &'a str {
        field
            .or(coll.soft_delete_field.as_deref())
            .unwrap_or(DEFAULT_SOFT_DELETE_FIELD)
    }

    /// Set the marker to now. True iff a row matched.
    pub async fn soft_delete(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        id: &str,
        field: Option<&str>,
    ) -> Result<bool, StoreError> {
        let ts = now();
        let q = sql::set_column(coll, id, Self::marker(coll, field), SqliteBindValue::from(ts.as_str()), &ts)?;
        Ok(CrudService::execute(conn, &q).await? > 0)
    }

    /// Clear the marker and return the row; `NotFound` if it does not exist.
    pub async fn restore(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        id: &str,
        field: Option<&str>,
    ) -> Result<Document, StoreError> {
        let q = sql::set_column(coll, id, Self::marker(coll, field), SqliteBindValue::Null, &now())?;
        if CrudService::execute(conn, &q).await? == 0 {
            return Err(StoreError::not_found(&coll.slug, id));
        }
        CrudService::find_by_id(conn, coll, id)
            .await?
            .ok_or_else(|| StoreError::not_found(&coll.slug, id))
    }
}
