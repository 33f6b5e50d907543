//! Find filters: a flat column -> predicate map plus pagination directives.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_LIMIT: u32 = 100;
pub const DEFAULT_VERSION_LIMIT: u32 = 10;

/// Largest OFFSET SQLite accepts; pages beyond it are simply past the end.
const MAX_OFFSET: u64 = i64::MAX as u64;

/// Keys of a filter map that are pagination/sort directives, never column predicates.
pub const RESERVED_KEYS: &[&str] = &["limit", "page", "sort", "order"];

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    /// `column = ?` with the encoded value bound.
    Equals(Value),
    IsNull,
    IsNotNull,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Condition {
    pub column: String,
    pub predicate: Predicate,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }

    fn parse(s: &str) -> Result<Self, StoreError> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(StoreError::InvalidFilter(format!("order must be asc or desc, got '{}'", s))),
        }
    }
}

/// Filter for `find`/`count`. Column names are validated against the collection when the
/// query is built into SQL, not here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FindQuery {
    pub conditions: Vec<Condition>,
    /// `None` = default (100); `Some(0)` = no limit.
    pub limit: Option<u32>,
    /// 1-based.
    pub page: Option<u32>,
    pub sort: Option<String>,
    pub order: Option<SortOrder>,
}

impl FindQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            predicate: Predicate::Equals(value.into()),
        });
        self
    }

    pub fn where_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            predicate: Predicate::IsNull,
        });
        self
    }

    pub fn where_not_null(mut self, column: impl Into<String>) -> Self {
        self.conditions.push(Condition {
            column: column.into(),
            predicate: Predicate::IsNotNull,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn sort(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some(column.into());
        self.order = Some(order);
        self
    }

    /// Parse a flat filter object. `null` means IS NULL, `{"$ne": null}` means IS NOT NULL,
    /// any other value is an equality match. `limit`/`page` accept numbers or numeric strings.
    pub fn from_json(filter: &Map<String, Value>) -> Result<Self, StoreError> {
        let mut q = FindQuery::new();
        for (key, value) in filter {
            match key.as_str() {
                "limit" => q.limit = Some(parse_u32("limit", value)?),
                "page" => q.page = Some(parse_u32("page", value)?),
                "sort" => {
                    q.sort = match value {
                        Value::Null => None,
                        Value::String(s) if s.is_empty() => None,
                        Value::String(s) => Some(s.clone()),
                        other => return Err(StoreError::InvalidFilter(format!("sort must be a string, got {}", other))),
                    }
                }
                "order" => {
                    q.order = match value {
                        Value::Null => None,
                        Value::String(s) => Some(SortOrder::parse(s)?),
                        other => return Err(StoreError::InvalidFilter(format!("order must be a string, got {}", other))),
                    }
                }
                _ => {
                    let predicate = match value {
                        Value::Null => Predicate::IsNull,
                        Value::Object(obj) if is_not_null_marker(obj) => Predicate::IsNotNull,
                        other => Predicate::Equals(other.clone()),
                    };
                    q.conditions.push(Condition {
                        column: key.clone(),
                        predicate,
                    });
                }
            }
        }
        Ok(q)
    }

    /// Effective page size; `None` means no LIMIT clause.
    pub fn effective_limit(&self) -> Option<u32> {
        match self.limit.unwrap_or(DEFAULT_LIMIT) {
            0 => None,
            n => Some(n),
        }
    }

    /// Row offset for the requested page.
    pub fn offset(&self) -> u64 {
        let page = self.page.unwrap_or(1).max(1);
        match self.effective_limit() {
            Some(limit) => (u64::from(page - 1) * u64::from(limit)).min(MAX_OFFSET),
            None => 0,
        }
    }

    /// `(column, order)`: `sort = "-title"` means title descending; otherwise `order`
    /// (default ascending) applies.
    pub fn sort_by(&self) -> Option<(&str, SortOrder)> {
        let sort = self.sort.as_deref()?;
        match sort.strip_prefix('-') {
            Some(col) => Some((col, SortOrder::Desc)),
            None => Some((sort, self.order.unwrap_or(SortOrder::Asc))),
        }
    }
}

fn is_not_null_marker(obj: &Map<String, Value>) -> bool {
    obj.len() == 1 && obj.get("$ne").map(Value::is_null).unwrap_or(false)
}

fn parse_u32(key: &str, value: &Value) -> Result<u32, StoreError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| StoreError::InvalidFilter(format!("{} must be a non-negative integer, got {}", key, value)))
}

/// Options for `find_versions` / `count_versions`.
#[derive(Clone, Debug, PartialEq)]
pub struct VersionQuery {
    pub limit: u32,
    pub page: u32,
    pub sort: SortOrder,
    pub status: Option<crate::model::Status>,
    pub include_autosave: bool,
}

impl Default for VersionQuery {
    fn default() -> Self {
        VersionQuery {
            limit: DEFAULT_VERSION_LIMIT,
            page: 1,
            sort: SortOrder::Desc,
            status: None,
            include_autosave: false,
        }
    }
}

impl VersionQuery {
    pub fn offset(&self) -> u64 {
        (u64::from(self.page.max(1) - 1) * u64::from(self.limit)).min(MAX_OFFSET)
    }
}
