//! Load collection and global definitions from JSON.

use crate::config::{validate_collections, validate_globals, FullConfig};
use crate::error::{ConfigError, StoreError};
use std::path::Path;

/// Parse and validate a full config document.
pub fn load_from_str(json: &str) -> Result<FullConfig, StoreError> {
    let config: FullConfig = serde_json::from_str(json).map_err(|e| ConfigError::Load(e.to_string()))?;
    validate_collections(&config.collections)?;
    validate_globals(&config.globals)?;
    Ok(config)
}

pub fn load_from_path(path: &Path) -> Result<FullConfig, StoreError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    tracing::debug!(path = %path.display(), "loading collection config");
    load_from_str(&raw)
}
