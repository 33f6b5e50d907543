//! Value codec: logical JSON values <-> physical SQLite cells.
//!
//! Storage format: booleans are INTEGER 0/1, numbers are REAL (or INTEGER when bound from an
//! integer), nested objects and arrays are JSON text in a TEXT column. Version snapshots and
//! global data use the same JSON text encoding, so a value round-trips identically whether it
//! is stored in a column or inside a snapshot.

use crate::config::FieldKind;
use crate::sql::SqliteBindValue;
use serde_json::{Map, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row};

/// Logical -> physical.
pub fn encode(value: &Value) -> SqliteBindValue {
    match value {
        Value::Null => SqliteBindValue::Null,
        Value::Bool(b) => SqliteBindValue::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqliteBindValue::Integer(i)
            } else {
                SqliteBindValue::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => SqliteBindValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => SqliteBindValue::Text(value.to_string()),
    }
}

/// Physical -> logical, guided by the declared kind of the column.
pub fn decode(raw: Value, kind: FieldKind) -> Value {
    match (kind, raw) {
        (_, Value::Null) => Value::Null,
        (FieldKind::Boolean, Value::Number(n)) => Value::Bool(n.as_f64().map(|f| f != 0.0).unwrap_or(false)),
        (FieldKind::Number, Value::Number(n)) => normalize_number(n),
        (k, Value::String(s)) if k.is_structured() => decode_json_text(&s),
        (FieldKind::Relationship, Value::String(s)) => {
            let trimmed = s.trim_start();
            if trimmed.starts_with('[') || trimmed.starts_with('{') {
                serde_json::from_str(&s).unwrap_or(Value::String(s))
            } else {
                Value::String(s)
            }
        }
        (_, other) => other,
    }
}

/// Parse stored JSON text. Corrupted rows degrade to an empty object.
pub fn decode_json_text(s: &str) -> Value {
    serde_json::from_str(s).unwrap_or_else(|_| Value::Object(Map::new()))
}

/// REAL columns hand back `3.0` for an integer input; report it as `3`.
fn normalize_number(n: serde_json::Number) -> Value {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9.0e15 => Value::Number((f as i64).into()),
        _ => Value::Number(n),
    }
}

/// Read every cell of a row as JSON (no kind applied).
pub fn row_to_json(row: &SqliteRow) -> Map<String, Value> {
    let mut map = Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, col.ordinal()));
    }
    map
}

fn cell_to_value(row: &SqliteRow, idx: usize) -> Value {
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(idx) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(idx) {
        return Value::String(s);
    }
    Value::Null
}
