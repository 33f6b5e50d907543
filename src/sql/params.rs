//! Physical values bound to SQLite statements.

use sqlx::encode::{Encode, IsNull};
use sqlx::sqlite::{Sqlite, SqliteTypeInfo};
use sqlx::Database;

/// A value that can be bound to a SQLite query. Built from JSON by `codec::encode`.
#[derive(Clone, Debug, PartialEq)]
pub enum SqliteBindValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl<'q> Encode<'q, Sqlite> for SqliteBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Sqlite as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            SqliteBindValue::Null => <Option<i64> as Encode<'q, Sqlite>>::encode_by_ref(&None, buf),
            SqliteBindValue::Integer(n) => <i64 as Encode<'q, Sqlite>>::encode_by_ref(n, buf),
            SqliteBindValue::Real(n) => <f64 as Encode<'q, Sqlite>>::encode_by_ref(n, buf),
            SqliteBindValue::Text(s) => <String as Encode<'q, Sqlite>>::encode_by_ref(s, buf),
        }
    }
}

impl sqlx::Type<Sqlite> for SqliteBindValue {
    fn type_info() -> SqliteTypeInfo {
        <String as sqlx::Type<Sqlite>>::type_info()
    }
}

impl From<&str> for SqliteBindValue {
    fn from(s: &str) -> Self {
        SqliteBindValue::Text(s.to_string())
    }
}

impl From<String> for SqliteBindValue {
    fn from(s: String) -> Self {
        SqliteBindValue::Text(s)
    }
}

impl From<i64> for SqliteBindValue {
    fn from(n: i64) -> Self {
        SqliteBindValue::Integer(n)
    }
}

impl From<bool> for SqliteBindValue {
    fn from(b: bool) -> Self {
        SqliteBindValue::Integer(i64::from(b))
    }
}

impl<T: Into<SqliteBindValue>> From<Option<T>> for SqliteBindValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqliteBindValue::Null)
    }
}
