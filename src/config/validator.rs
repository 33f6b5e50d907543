//! Identifier allow-list and collection config validation.
//!
//! Every table, index and column name is checked here before it is interpolated into SQL.
//! Values never pass through this module; they are always bound as parameters.

use crate::config::{CollectionConfig, GlobalConfig};
use crate::error::{ConfigError, StoreError};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Columns every collection table carries.
pub const SYSTEM_COLUMNS: &[&str] = &["id", "createdAt", "updatedAt", "_status"];

const TABLE_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_-]*$";
const COLUMN_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

static TABLE_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
static COLUMN_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

fn is_match(cell: &'static OnceLock<Result<Regex, regex::Error>>, pattern: &str, name: &str) -> Result<bool, StoreError> {
    match cell.get_or_init(|| Regex::new(pattern)) {
        Ok(re) => Ok(re.is_match(name)),
        Err(e) => Err(ConfigError::Validation(format!("invalid identifier pattern: {}", e)).into()),
    }
}

/// Collection slugs, physical table names and index names: letters, digits, `_`, `-`.
pub fn validate_table_name(name: &str) -> Result<(), StoreError> {
    if is_match(&TABLE_RE, TABLE_PATTERN, name)? {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier {
            kind: "table",
            name: name.to_string(),
        })
    }
}

/// Column names: letters, digits, `_`.
pub fn validate_column_name(name: &str) -> Result<(), StoreError> {
    if is_match(&COLUMN_RE, COLUMN_PATTERN, name)? {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier {
            kind: "column",
            name: name.to_string(),
        })
    }
}

/// Validate one collection: identifiers first, then structural rules.
pub fn validate_collection(config: &CollectionConfig) -> Result<(), StoreError> {
    validate_table_name(&config.slug)?;
    if let Some(db_name) = &config.db_name {
        validate_table_name(db_name)?;
    }
    let marker = config.soft_delete.field();
    if let Some(marker) = marker {
        validate_column_name(marker)?;
        if SYSTEM_COLUMNS.contains(&marker) {
            return Err(ConfigError::Validation(format!(
                "{}: soft-delete marker '{}' collides with a system column",
                config.slug, marker
            ))
            .into());
        }
    }

    let mut seen = HashSet::new();
    for f in &config.fields {
        validate_column_name(&f.name)?;
        if SYSTEM_COLUMNS.contains(&f.name.as_str()) || marker == Some(f.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "{}: field '{}' collides with a system column",
                config.slug, f.name
            ))
            .into());
        }
        if !seen.insert(f.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "{}: duplicate field '{}'",
                config.slug, f.name
            ))
            .into());
        }
    }

    for idx in &config.indexes {
        if idx.columns.is_empty() {
            return Err(ConfigError::Validation(format!("{}: index with no columns", config.slug)).into());
        }
        for col in &idx.columns {
            validate_column_name(col)?;
        }
        if let Some(name) = &idx.name {
            validate_table_name(name)?;
        }
    }
    Ok(())
}

/// Validate a batch: each collection, then uniqueness of slugs and physical table names.
pub fn validate_collections(configs: &[CollectionConfig]) -> Result<(), StoreError> {
    let mut slugs = HashSet::new();
    let mut tables = HashSet::new();
    for c in configs {
        validate_collection(c)?;
        if !slugs.insert(c.slug.as_str()) || !tables.insert(c.table_name()) {
            return Err(ConfigError::DuplicateCollection(c.slug.clone()).into());
        }
    }
    Ok(())
}

pub fn validate_globals(globals: &[GlobalConfig]) -> Result<(), StoreError> {
    let mut slugs = HashSet::new();
    for g in globals {
        validate_table_name(&g.slug)?;
        for f in &g.fields {
            validate_column_name(&f.name)?;
        }
        if !slugs.insert(g.slug.as_str()) {
            return Err(ConfigError::Validation(format!("duplicate global '{}'", g.slug)).into());
        }
    }
    Ok(())
}
