//! Builds parameterized SELECT, INSERT, UPDATE, DELETE from a resolved collection.

use crate::codec::encode;
use crate::config::{validate_column_name, ResolvedCollection};
use crate::error::StoreError;
use crate::query::{FindQuery, Predicate};
use crate::sql::SqliteBindValue;
use serde_json::{Map, Value};

/// Quote identifier for SQLite (already validated against the allow-list).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

#[derive(Clone, Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqliteBindValue>,
}

impl QueryBuf {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_param(&mut self, v: impl Into<SqliteBindValue>) {
        self.params.push(v.into());
    }
}

/// SELECT list: every resolved column, in declaration order.
fn select_column_list(coll: &ResolvedCollection) -> String {
    coll.columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Filter/sort key: must pass the allow-list and name a column of the collection.
fn checked_column<'a>(coll: &ResolvedCollection, name: &'a str) -> Result<&'a str, StoreError> {
    validate_column_name(name)?;
    if !coll.has_column(name) {
        return Err(StoreError::InvalidIdentifier {
            kind: "column",
            name: format!("{}.{}", coll.slug, name),
        });
    }
    Ok(name)
}

fn where_clause(coll: &ResolvedCollection, query: &FindQuery, q: &mut QueryBuf) -> Result<String, StoreError> {
    let mut parts = Vec::with_capacity(query.conditions.len());
    for cond in &query.conditions {
        let col = quoted(checked_column(coll, &cond.column)?);
        match &cond.predicate {
            Predicate::IsNull => parts.push(format!("{} IS NULL", col)),
            Predicate::IsNotNull => parts.push(format!("{} IS NOT NULL", col)),
            Predicate::Equals(v) => {
                q.push_param(encode(v));
                parts.push(format!("{} = ?", col));
            }
        }
    }
    Ok(if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    })
}

/// SELECT list with filters, optional ORDER BY (rowid when unsorted), LIMIT/OFFSET.
/// Every filter and sort key is checked before any SQL text is produced.
pub fn select_list(coll: &ResolvedCollection, query: &FindQuery) -> Result<QueryBuf, StoreError> {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(coll, query, &mut q)?;
    let order_clause = match query.sort_by() {
        Some((col, order)) => format!(
            " ORDER BY {} {}, rowid {}",
            quoted(checked_column(coll, col)?),
            order.as_sql(),
            order.as_sql()
        ),
        None => " ORDER BY rowid".to_string(),
    };
    let page_clause = match query.effective_limit() {
        Some(limit) => format!(" LIMIT {} OFFSET {}", limit, query.offset()),
        None => String::new(),
    };
    q.sql = format!(
        "SELECT {} FROM {}{}{}{}",
        select_column_list(coll),
        quoted(&coll.table_name),
        where_clause,
        order_clause,
        page_clause
    );
    Ok(q)
}

/// SELECT COUNT(*) with the same filters; pagination ignored.
pub fn count(coll: &ResolvedCollection, query: &FindQuery) -> Result<QueryBuf, StoreError> {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(coll, query, &mut q)?;
    q.sql = format!("SELECT COUNT(*) FROM {}{}", quoted(&coll.table_name), where_clause);
    Ok(q)
}

/// SELECT by id.
pub fn select_by_id(coll: &ResolvedCollection, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(id);
    q.sql = format!(
        "SELECT {} FROM {} WHERE \"id\" = ?",
        select_column_list(coll),
        quoted(&coll.table_name)
    );
    q
}

/// INSERT: one placeholder per column; values from body. Columns with a DB default are
/// omitted when the body does not provide them (or sends `null`), so the DB default applies.
pub fn insert(coll: &ResolvedCollection, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    for c in &coll.columns {
        let val = body.get(&c.name).filter(|v| !v.is_null());
        if val.is_none() && c.has_default {
            continue;
        }
        q.push_param(val.map(encode).unwrap_or(SqliteBindValue::Null));
        cols.push(quoted(&c.name));
    }
    let placeholders = vec!["?"; cols.len()].join(", ");
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(&coll.table_name),
        cols.join(", "),
        placeholders,
        select_column_list(coll)
    );
    q
}

/// UPDATE by id: SET only columns present in body (and in the collection), never `id`
/// or `createdAt`. Caller supplies `updatedAt` in the body.
pub fn update(coll: &ResolvedCollection, id: &str, body: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &coll.columns {
        if c.name == "id" || c.name == "createdAt" {
            continue;
        }
        let Some(v) = body.get(&c.name) else { continue };
        q.push_param(encode(v));
        sets.push(format!("{} = ?", quoted(&c.name)));
    }
    q.push_param(id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE \"id\" = ?",
        quoted(&coll.table_name),
        sets.join(", ")
    );
    q
}

/// DELETE by id.
pub fn delete(coll: &ResolvedCollection, id: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(id);
    q.sql = format!("DELETE FROM {} WHERE \"id\" = ?", quoted(&coll.table_name));
    q
}

/// UPDATE of one column plus `updatedAt`, by id. Used for the soft-delete marker and `_status`.
pub fn set_column(
    coll: &ResolvedCollection,
    id: &str,
    column: &str,
    value: SqliteBindValue,
    now: &str,
) -> Result<QueryBuf, StoreError> {
    let column = checked_column(coll, column)?;
    let mut q = QueryBuf::new();
    q.push_param(value);
    q.push_param(now);
    q.push_param(id);
    q.sql = format!(
        "UPDATE {} SET {} = ?, \"updatedAt\" = ? WHERE \"id\" = ?",
        quoted(&coll.table_name),
        quoted(column)
    );
    Ok(q)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, CollectionConfig, FieldConfig, FieldKind, SoftDeleteConfig};
    use crate::query::SortOrder;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn posts() -> ResolvedCollection {
        resolve(
            &CollectionConfig::new("posts")
                .versions(true)
                .soft_delete(SoftDeleteConfig::Enabled)
                .field(FieldConfig::new("title", FieldKind::Text).required())
                .field(FieldConfig::new("featured", FieldKind::Boolean)),
        )
        .unwrap()
    }

    #[test]
    fn test_select_list_binds_values_and_paginates() {
        let query = FindQuery::new()
            .where_eq("title", "A")
            .where_null("deletedAt")
            .where_eq("featured", true)
            .limit(10)
            .page(2);
        let q = select_list(&posts(), &query).unwrap();
        assert_eq!(
            q.sql,
            "SELECT \"id\", \"createdAt\", \"updatedAt\", \"_status\", \"deletedAt\", \"title\", \"featured\" \
             FROM \"posts\" WHERE \"title\" = ? AND \"deletedAt\" IS NULL AND \"featured\" = ? \
             ORDER BY rowid LIMIT 10 OFFSET 10"
        );
        assert_eq!(q.params, vec![SqliteBindValue::Text("A".into()), SqliteBindValue::Integer(1)]);
    }

    #[test]
    fn test_select_list_unbounded_and_sorted() {
        let query = FindQuery::new().where_not_null("deletedAt").limit(0).sort("title", SortOrder::Desc);
        let q = select_list(&posts(), &query).unwrap();
        assert!(q.sql.ends_with("WHERE \"deletedAt\" IS NOT NULL ORDER BY \"title\" DESC, rowid DESC"));
        assert!(q.params.is_empty());
    }

    #[test]
    fn test_injection_in_filter_key_is_rejected() {
        let query = FindQuery::new().where_eq("title\" OR 1=1 --", "x");
        let err = select_list(&posts(), &query).unwrap_err();
        assert!(matches!(err, StoreError::InvalidIdentifier { kind: "column", .. }));
    }

    #[test]
    fn test_unknown_filter_column_is_rejected() {
        let query = FindQuery::new().where_eq("nope", "x");
        assert!(matches!(select_list(&posts(), &query), Err(StoreError::InvalidIdentifier { .. })));
        let query = FindQuery::new().sort("nope", SortOrder::Asc);
        assert!(select_list(&posts(), &query).is_err());
    }

    #[test]
    fn test_insert_omits_defaulted_status_when_absent() {
        let mut body = Map::new();
        body.insert("id".into(), json!("x"));
        body.insert("createdAt".into(), json!("t"));
        body.insert("updatedAt".into(), json!("t"));
        body.insert("title".into(), json!("A"));
        let q = insert(&posts(), &body);
        assert!(q.sql.starts_with(
            "INSERT INTO \"posts\" (\"id\", \"createdAt\", \"updatedAt\", \"deletedAt\", \"title\", \"featured\") VALUES (?, ?, ?, ?, ?, ?)"
        ));
        assert_eq!(q.params[3], SqliteBindValue::Null);
    }

    #[test]
    fn test_insert_treats_null_status_as_absent() {
        let mut body = Map::new();
        body.insert("id".into(), json!("x"));
        body.insert("_status".into(), json!(null));
        body.insert("title".into(), json!("A"));
        let q = insert(&posts(), &body);
        assert!(q.sql.starts_with(
            "INSERT INTO \"posts\" (\"id\", \"createdAt\", \"updatedAt\", \"deletedAt\", \"title\", \"featured\") VALUES"
        ));
        assert_eq!(q.params.len(), 6);
    }

    #[test]
    fn test_update_skips_immutable_and_unknown_keys() {
        let mut body = Map::new();
        body.insert("id".into(), json!("other"));
        body.insert("createdAt".into(), json!("t0"));
        body.insert("updatedAt".into(), json!("t1"));
        body.insert("title".into(), json!("B"));
        body.insert("bogus".into(), json!(1));
        let q = update(&posts(), "doc-1", &body);
        assert_eq!(q.sql, "UPDATE \"posts\" SET \"updatedAt\" = ?, \"title\" = ? WHERE \"id\" = ?");
        assert_eq!(
            q.params,
            vec![
                SqliteBindValue::Text("t1".into()),
                SqliteBindValue::Text("B".into()),
                SqliteBindValue::Text("doc-1".into())
            ]
        );
    }

    #[test]
    fn test_count_ignores_pagination() {
        let q = count(&posts(), &FindQuery::new().where_null("deletedAt").limit(5).page(3)).unwrap();
        assert_eq!(q.sql, "SELECT COUNT(*) FROM \"posts\" WHERE \"deletedAt\" IS NULL");
    }
}
