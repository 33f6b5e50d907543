//! Version history and draft/publish status.

use crate::codec::decode_json_text;
use crate::config::ResolvedCollection;
use crate::error::StoreError;
use crate::model::{new_id, now, Document, DocumentVersion, Status, VersionOptions};
use crate::query::VersionQuery;
use crate::service::CrudService;
use crate::sql::{self, versions, SqliteBindValue};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

const SAVEPOINT_SQL: &str = "SAVEPOINT restore_version";
const RELEASE_SQL: &str = "RELEASE restore_version";
const ROLLBACK_TO_SQL: &str = "ROLLBACK TO restore_version";

pub struct VersionService;

impl VersionService {
    fn table(coll: &ResolvedCollection) -> Result<String, StoreError> {
        coll.versions_table()
            .ok_or_else(|| StoreError::VersioningNotEnabled(coll.slug.clone()))
    }

    /// Append a snapshot of `data` for `parent`. `publishedAt` is set only for published versions.
    pub async fn create_version(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        parent: &str,
        data: &Value,
        opts: VersionOptions,
    ) -> Result<DocumentVersion, StoreError> {
        let table = Self::table(coll)?;
        let ts = now();
        let version = DocumentVersion {
            id: new_id(),
            parent: parent.to_string(),
            version: data.clone(),
            status: opts.status,
            autosave: opts.autosave,
            published_at: (opts.status == Status::Published).then(|| ts.clone()),
            created_at: ts.clone(),
            updated_at: ts,
        };
        let q = versions::insert_version(&table, &version);
        CrudService::execute(conn, &q).await?;
        Ok(version)
    }

    pub async fn find_versions(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        parent: &str,
        opts: &VersionQuery,
    ) -> Result<Vec<DocumentVersion>, StoreError> {
        let table = Self::table(coll)?;
        let q = versions::select_versions(&table, parent, opts);
        let rows = CrudService::query_many(conn, &q).await?;
        rows.iter().map(version_from_row).collect()
    }

    pub async fn find_version_by_id(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        id: &str,
    ) -> Result<Option<DocumentVersion>, StoreError> {
        let table = Self::table(coll)?;
        let q = versions::select_version_by_id(&table, id);
        CrudService::query_optional(conn, &q)
            .await?
            .as_ref()
            .map(version_from_row)
            .transpose()
    }

    pub async fn count_versions(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        parent: &str,
        opts: &VersionQuery,
    ) -> Result<u64, StoreError> {
        let table = Self::table(coll)?;
        let q = versions::count_versions(&table, parent, opts);
        CrudService::query_count(conn, &q).await
    }

    /// Write the snapshot back into the parent document and record the restore as a new,
    /// non-autosave version with the restored version's status. Both writes land or neither does.
    pub async fn restore_version(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        version_id: &str,
    ) -> Result<Document, StoreError> {
        Self::table(coll)?;
        let version = Self::find_version_by_id(conn, coll, version_id)
            .await?
            .ok_or_else(|| StoreError::version_not_found(&coll.slug, version_id))?;

        sqlx::query(SAVEPOINT_SQL).execute(&mut *conn).await?;
        let result = match Self::apply_restore(conn, coll, &version).await {
            Ok(doc) => sqlx::query(RELEASE_SQL)
                .execute(&mut *conn)
                .await
                .map(|_| doc)
                .map_err(StoreError::from),
            Err(e) => Err(e),
        };
        if result.is_err() {
            // undo the restore and drop the savepoint, so the connection is back where it started
            for sql in [ROLLBACK_TO_SQL, RELEASE_SQL] {
                if let Err(rb) = sqlx::query(sql).execute(&mut *conn).await {
                    tracing::warn!(error = %rb, version = %version_id, "rollback of version restore failed");
                    break;
                }
            }
        }
        result
    }

    async fn apply_restore(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        version: &DocumentVersion,
    ) -> Result<Document, StoreError> {
        let snapshot = match &version.version {
            Value::Object(map) => map.clone(),
            _ => Document::new(),
        };
        let doc = CrudService::update(conn, coll, &version.parent, &snapshot).await?;
        let opts = VersionOptions {
            status: version.status,
            autosave: false,
        };
        Self::create_version(conn, coll, &version.parent, &version.version, opts).await?;
        Ok(doc)
    }

    /// Delete versions of `parent`, keeping the `keep_latest` most recent when it is positive.
    /// Returns the number deleted.
    pub async fn delete_versions(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        parent: &str,
        keep_latest: Option<i64>,
    ) -> Result<u64, StoreError> {
        let table = Self::table(coll)?;
        let q = versions::delete_versions(&table, parent, keep_latest);
        CrudService::execute(conn, &q).await
    }

    /// Flip the live document's `_status` and bump `updatedAt`. Records no version.
    pub async fn update_status(
        conn: &mut SqliteConnection,
        coll: &ResolvedCollection,
        id: &str,
        status: Status,
    ) -> Result<(), StoreError> {
        if !coll.drafts {
            return Err(StoreError::VersioningNotEnabled(coll.slug.clone()));
        }
        let q = sql::set_column(coll, id, "_status", SqliteBindValue::from(status.as_str()), &now())?;
        if CrudService::execute(conn, &q).await? == 0 {
            return Err(StoreError::not_found(&coll.slug, id));
        }
        Ok(())
    }
}

fn version_from_row(row: &SqliteRow) -> Result<DocumentVersion, StoreError> {
    let snapshot: String = row.try_get("version")?;
    let status: String = row.try_get("_status")?;
    Ok(DocumentVersion {
        id: row.try_get("id")?,
        parent: row.try_get("parent")?,
        version: decode_json_text(&snapshot),
        status: status.parse()?,
        autosave: row.try_get::<i64, _>("autosave")? != 0,
        published_at: row.try_get("publishedAt")?,
        created_at: row.try_get("createdAt")?,
        updated_at: row.try_get("updatedAt")?,
    })
}
