//! Queries against the shared `_sys_globals` and `_sys_seeds` tables.

use crate::migration::{GLOBALS_TABLE, SEEDS_TABLE};
use crate::sql::{quoted, QueryBuf};

pub fn select_global(slug: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(slug);
    q.sql = format!(
        "SELECT \"slug\", \"data\", \"createdAt\", \"updatedAt\" FROM {} WHERE \"slug\" = ?",
        quoted(GLOBALS_TABLE)
    );
    q
}

/// Single-statement upsert: insert, or overwrite `data` and `updatedAt` of the existing row.
pub fn upsert_global(slug: &str, data: String, now: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(slug);
    q.push_param(data);
    q.push_param(now);
    q.push_param(now);
    q.sql = format!(
        "INSERT INTO {} (\"slug\", \"data\", \"createdAt\", \"updatedAt\") VALUES (?, ?, ?, ?) \
         ON CONFLICT(\"slug\") DO UPDATE SET \"data\" = excluded.\"data\", \"updatedAt\" = excluded.\"updatedAt\" \
         RETURNING \"slug\", \"data\", \"createdAt\", \"updatedAt\"",
        quoted(GLOBALS_TABLE)
    );
    q
}

pub fn select_seed(name: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(name);
    q.sql = format!("SELECT COUNT(*) FROM {} WHERE \"name\" = ?", quoted(SEEDS_TABLE));
    q
}

pub fn insert_seed(name: &str, now: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(name);
    q.push_param(now);
    q.sql = format!(
        "INSERT INTO {} (\"name\", \"appliedAt\") VALUES (?, ?) ON CONFLICT(\"name\") DO NOTHING",
        quoted(SEEDS_TABLE)
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::SqliteBindValue;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_upsert_is_one_statement() {
        let q = upsert_global("site", "{}".into(), "t");
        assert!(q.sql.starts_with("INSERT INTO \"_sys_globals\""));
        assert!(q.sql.contains("ON CONFLICT(\"slug\") DO UPDATE SET \"data\" = excluded.\"data\""));
        assert!(!q.sql.contains("\"createdAt\" = excluded"));
        assert_eq!(q.params.len(), 4);
        assert_eq!(q.params[1], SqliteBindValue::Text("{}".into()));
    }

    #[test]
    fn test_insert_seed_ignores_duplicates() {
        let q = insert_seed("initial", "t");
        assert!(q.sql.ends_with("ON CONFLICT(\"name\") DO NOTHING"));
    }
}
