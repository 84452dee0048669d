//! SQLite key/value store adapter.

use crate::domain::config_validation::StoreSettings;
use crate::domain::error::FundwatchError;
use crate::ports::store_port::KvStore;
use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{OptionalExtension, params};
use tracing::debug;

pub const MEMORY_PATH: &str = ":memory:";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_error(e: r2d2::Error) -> FundwatchError {
    FundwatchError::Store {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> FundwatchError {
    FundwatchError::StoreQuery {
        reason: e.to_string(),
    }
}

impl SqliteAdapter {
    /// Open the configured database file and create the schema.
    pub fn open(settings: &StoreSettings) -> Result<Self, FundwatchError> {
        if settings.path == MEMORY_PATH {
            return Self::in_memory();
        }
        let manager = SqliteConnectionManager::file(&settings.path);
        let pool = Pool::builder()
            .max_size(settings.pool_size)
            .build(manager)
            .map_err(pool_error)?;
        let adapter = Self { pool };
        adapter.initialize_schema()?;
        debug!(path = %settings.path, "sqlite store opened");
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, FundwatchError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(pool_error)?;
        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, FundwatchError> {
        self.pool.get().map_err(pool_error)
    }

    pub fn initialize_schema(&self) -> Result<(), FundwatchError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS kv (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );",
            )
            .map_err(query_error)
    }
}

impl KvStore for SqliteAdapter {
    fn get(&self, key: &str) -> Result<Option<String>, FundwatchError> {
        self.conn()?
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()
            .map_err(query_error)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), FundwatchError> {
        self.conn()?
            .execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                                                updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .map_err(query_error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), FundwatchError> {
        self.conn()?
            .execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(query_error)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_initialization() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        assert_eq!(adapter.get("watchlist").unwrap(), None);
    }

    #[test]
    fn set_get_overwrite_remove() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.set("tags", r#"["Tech"]"#).unwrap();
        assert_eq!(adapter.get("tags").unwrap().as_deref(), Some(r#"["Tech"]"#));

        adapter.set("tags", r#"["Tech","Health"]"#).unwrap();
        assert_eq!(
            adapter.get("tags").unwrap().as_deref(),
            Some(r#"["Tech","Health"]"#)
        );

        adapter.remove("tags").unwrap();
        assert_eq!(adapter.get("tags").unwrap(), None);
        adapter.remove("tags").unwrap();
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let settings = StoreSettings {
            path: dir.path().join("funds.db").to_string_lossy().into_owned(),
            pool_size: 2,
        };
        SqliteAdapter::open(&settings)
            .unwrap()
            .set("watchlist", "[]")
            .unwrap();
        let reopened = SqliteAdapter::open(&settings).unwrap();
        assert_eq!(reopened.get("watchlist").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn memory_path_opens_in_memory() {
        let settings = StoreSettings {
            path: MEMORY_PATH.into(),
            pool_size: 4,
        };
        let adapter = SqliteAdapter::open(&settings).unwrap();
        adapter.set("k", "v").unwrap();
        assert_eq!(adapter.get("k").unwrap().as_deref(), Some("v"));
    }
}
