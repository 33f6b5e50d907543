//! Compile collections to DDL and apply it: base table, `{table}_versions`, indexes, the
//! soft-delete marker migration, and the shared `_sys_*` tables.
//!
//! Everything here is "create if missing"; running `initialize` twice is a no-op the second time.

use crate::config::{ResolvedCollection, ResolvedIndex};
use crate::error::StoreError;
use crate::sql::quoted;
use sqlx::SqliteConnection;

pub const GLOBALS_TABLE: &str = "_sys_globals";
pub const SEEDS_TABLE: &str = "_sys_seeds";

/// CREATE TABLE for the collection's base table.
pub fn compile_table(coll: &ResolvedCollection) -> String {
    let mut col_defs = vec![format!("{} TEXT PRIMARY KEY", quoted("id"))];
    for c in coll.columns.iter().filter(|c| c.name != "id") {
        let mut def = format!("{} {}", quoted(&c.name), c.kind.sql_type());
        if c.name == "_status" {
            def.push_str(" NOT NULL DEFAULT 'draft'");
        } else if !c.nullable {
            def.push_str(" NOT NULL");
        }
        col_defs.push(def);
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(&coll.table_name),
        col_defs.join(",\n  ")
    )
}

/// CREATE TABLE plus its three indexes for `{table}_versions`; `None` when versioning is off.
pub fn compile_version_table(coll: &ResolvedCollection) -> Option<Vec<String>> {
    let table = coll.versions_table()?;
    let q_table = quoted(&table);
    let create = format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
  "id" TEXT PRIMARY KEY,
  "parent" TEXT NOT NULL REFERENCES {}("id") ON DELETE CASCADE,
  "version" TEXT NOT NULL,
  "_status" TEXT NOT NULL DEFAULT 'draft',
  "autosave" INTEGER NOT NULL DEFAULT 0,
  "publishedAt" TEXT,
  "createdAt" TEXT NOT NULL,
  "updatedAt" TEXT NOT NULL
)"#,
        q_table,
        quoted(&coll.table_name)
    );
    let mut stmts = vec![create];
    for (suffix, col) in [("parent", "parent"), ("status", "_status"), ("created_at", "createdAt")] {
        stmts.push(format!(
            "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
            quoted(&format!("{}_{}_idx", table, suffix)),
            q_table,
            quoted(col)
        ));
    }
    Some(stmts)
}

fn compile_index(table: &str, idx: &ResolvedIndex) -> String {
    let cols: Vec<String> = idx.columns.iter().map(|c| quoted(c)).collect();
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
        if idx.unique { "UNIQUE " } else { "" },
        quoted(&idx.name),
        quoted(table),
        cols.join(", ")
    )
}

/// Declared indexes plus the soft-delete marker index.
pub fn compile_indexes(coll: &ResolvedCollection) -> Vec<String> {
    let mut stmts: Vec<String> = coll
        .indexes
        .iter()
        .map(|idx| compile_index(&coll.table_name, idx))
        .collect();
    if let Some(marker) = &coll.soft_delete_field {
        stmts.push(compile_index(
            &coll.table_name,
            &ResolvedIndex {
                name: format!("{}_{}_idx", coll.table_name, marker),
                columns: vec![marker.clone()],
                unique: false,
            },
        ));
    }
    stmts
}

pub fn compile_globals_table() -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
  "slug" TEXT PRIMARY KEY,
  "data" TEXT NOT NULL,
  "createdAt" TEXT NOT NULL,
  "updatedAt" TEXT NOT NULL
)"#,
        quoted(GLOBALS_TABLE)
    )
}

pub fn compile_seeds_table() -> String {
    format!(
        r#"CREATE TABLE IF NOT EXISTS {} (
  "name" TEXT PRIMARY KEY,
  "appliedAt" TEXT NOT NULL
)"#,
        quoted(SEEDS_TABLE)
    )
}

async fn execute_ddl(conn: &mut SqliteConnection, sql: &str) -> Result<(), StoreError> {
    tracing::debug!(sql = %sql, "ddl");
    sqlx::query(sql).execute(&mut *conn).await?;
    Ok(())
}

async fn column_exists(conn: &mut SqliteConnection, table: &str, column: &str) -> Result<bool, StoreError> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pragma_table_info(?) WHERE name = ?")
        .bind(table)
        .bind(column)
        .fetch_one(&mut *conn)
        .await?;
    Ok(n > 0)
}

/// Add the soft-delete marker to a table created before soft-delete was enabled.
/// A concurrent "duplicate column name" is treated as success.
async fn ensure_marker_column(conn: &mut SqliteConnection, coll: &ResolvedCollection) -> Result<(), StoreError> {
    let Some(marker) = &coll.soft_delete_field else {
        return Ok(());
    };
    if column_exists(conn, &coll.table_name, marker).await? {
        return Ok(());
    }
    let sql = format!(
        "ALTER TABLE {} ADD COLUMN {} TEXT",
        quoted(&coll.table_name),
        quoted(marker)
    );
    tracing::debug!(sql = %sql, "ddl");
    match sqlx::query(&sql).execute(&mut *conn).await {
        Ok(_) => {
            tracing::info!(table = %coll.table_name, column = %marker, "added soft-delete column");
            Ok(())
        }
        Err(sqlx::Error::Database(e)) if e.message().contains("duplicate column name") => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Ensure every table, column and index for the given collections exists, plus `_sys_seeds`.
pub async fn apply_collections(conn: &mut SqliteConnection, collections: &[ResolvedCollection]) -> Result<(), StoreError> {
    execute_ddl(conn, &compile_seeds_table()).await?;
    for coll in collections {
        execute_ddl(conn, &compile_table(coll)).await?;
        ensure_marker_column(conn, coll).await?;
        for stmt in compile_indexes(coll) {
            execute_ddl(conn, &stmt).await?;
        }
        if let Some(stmts) = compile_version_table(coll) {
            for stmt in stmts {
                execute_ddl(conn, &stmt).await?;
            }
        }
        tracing::info!(collection = %coll.slug, table = %coll.table_name, versions = coll.versions, "collection ready");
    }
    Ok(())
}

pub async fn apply_globals(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    execute_ddl(conn, &compile_globals_table()).await
}
