//! Queries against `{table}_versions`. Ordering is `createdAt` with insertion order as the
//! tie-break, so "most recent" is stable even for snapshots written in the same microsecond.

use crate::model::DocumentVersion;
use crate::query::{SortOrder, VersionQuery};
use crate::sql::{quoted, QueryBuf};

const VERSION_COLUMNS: &str =
    "\"id\", \"parent\", \"version\", \"_status\", \"autosave\", \"publishedAt\", \"createdAt\", \"updatedAt\"";

pub fn insert_version(table: &str, v: &DocumentVersion) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(v.id.as_str());
    q.push_param(v.parent.as_str());
    q.push_param(v.version.to_string());
    q.push_param(v.status.as_str());
    q.push_param(v.autosave);
    q.push_param(v.published_at.clone());
    q.push_param(v.created_at.as_str());
    q.push_param(v.updated_at.as_str());
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        quoted(table),
        VERSION_COLUMNS
    );
    q
}

fn version_filter(parent: &str, opts: &VersionQuery, q: &mut QueryBuf) -> String {
    let mut parts = vec!["\"parent\" = ?".to_string()];
    q.push_param(parent);
    if !opts.include_autosave {
        parts.push("\"autosave\" = 0".to_string());
    }
    if let Some(status) = opts.status {
        q.push_param(status.as_str());
        parts.push("\"_status\" = ?".to_string());
    }
    parts.join(" AND ")
}

pub fn select_versions(table: &str, parent: &str, opts: &VersionQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let filter = version_filter(parent, opts, &mut q);
    let dir = opts.sort.as_sql();
    let page_clause = if opts.limit == 0 {
        String::new()
    } else {
        format!(" LIMIT {} OFFSET {}", opts.limit, opts.offset())
    };
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} ORDER BY \"createdAt\" {}, rowid {}{}",
        VERSION_COLUMNS,
        quoted(table),
        filter,
        dir,
        dir,
        page_clause
    );
    q
}

pub fn count_versions(table: &str, parent: &str, opts: &VersionQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let filter = version_filter(parent, opts, &mut q);
    q.sql = format!("SELECT COUNT(*) FROM {} WHERE {}", quoted(table), filter);
    q
}

pub fn select_version_by_id(table: &str, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(id);
    q.sql = format!("SELECT {} FROM {} WHERE \"id\" = ?", VERSION_COLUMNS, quoted(table));
    q
}

/// DELETE versions of `parent`. With `keep_latest = Some(n)`, n > 0, the n most recent survive.
pub fn delete_versions(table: &str, parent: &str, keep_latest: Option<i64>) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(parent);
    let table = quoted(table);
    match keep_latest.filter(|n| *n > 0) {
        None => {
            q.sql = format!("DELETE FROM {} WHERE \"parent\" = ?", table);
        }
        Some(keep) => {
            q.push_param(parent);
            q.push_param(keep);
            q.sql = format!(
                "DELETE FROM {t} WHERE \"parent\" = ? AND \"id\" NOT IN (\
                 SELECT \"id\" FROM {t} WHERE \"parent\" = ? ORDER BY \"createdAt\" {d}, rowid {d} LIMIT ?)",
                t = table,
                d = SortOrder::Desc.as_sql()
            );
        }
    }
    q
}
