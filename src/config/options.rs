//! Runtime options for opening a store. Read from env: `VELLUM_DATABASE_URL` (fallback
//! `DATABASE_URL`), `VELLUM_MAX_READERS`, `VELLUM_BUSY_TIMEOUT_MS`.

use crate::error::{ConfigError, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://vellum.db";
pub const DEFAULT_MAX_READERS: u32 = 4;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

#[derive(Clone, Debug)]
pub struct StoreOptions {
    /// `sqlite://path/to/file.db`. Must be a file: reader connections and the writer share it.
    pub database_url: String,
    pub max_readers: u32,
    pub busy_timeout: Duration,
}

impl StoreOptions {
    pub fn new(database_url: impl Into<String>) -> Self {
        StoreOptions {
            database_url: database_url.into(),
            max_readers: DEFAULT_MAX_READERS,
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
        }
    }

    /// Options for a database file on disk.
    pub fn for_path(path: &std::path::Path) -> Self {
        Self::new(format!("sqlite://{}", path.display()))
    }

    pub fn from_env() -> Result<Self, StoreError> {
        let database_url = std::env::var("VELLUM_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.into());
        let max_readers = env_parse("VELLUM_MAX_READERS", DEFAULT_MAX_READERS)?;
        let busy_ms = env_parse("VELLUM_BUSY_TIMEOUT_MS", DEFAULT_BUSY_TIMEOUT_MS)?;
        Ok(StoreOptions {
            database_url,
            max_readers: max_readers.max(1),
            busy_timeout: Duration::from_millis(busy_ms),
        })
    }

    /// Connect options shared by the writer connection and the reader pool:
    /// WAL journal so readers never block on the single writer.
    pub fn connect_options(&self) -> Result<SqliteConnectOptions, StoreError> {
        let opts = SqliteConnectOptions::from_str(&self.database_url)
            .map_err(|e| ConfigError::Load(format!("invalid database url: {}", e)))?;
        Ok(opts
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout))
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> Result<T, StoreError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Load(format!("{} must be a number, got '{}'", key, raw)).into()),
        Err(_) => Ok(default),
    }
}
