// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.
//!
//! File databases also get a second, `query_only` connection for lookups, so
//! reads run beside a write transaction instead of queueing behind it (WAL).

use std::path::Path;

use leadpool_config::model::StorageConfig;
use leadpool_core::LeadpoolError;
use rusqlite::ErrorCode;
use tracing::debug;

use crate::migrations::run_migrations;

/// Handle to the single-writer SQLite connection and its read-only companion.
///
/// Cloning the inner connection shares the same background thread, so every
/// closure passed to [`tokio_rusqlite::Connection::call`] runs one at a time.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    /// `None` for in-memory databases, which cannot be shared across connections.
    reader: Option<tokio_rusqlite::Connection>,
}

impl Database {
    /// Open (or create) the database at `path` with default settings and run migrations.
    pub async fn open(path: &str) -> Result<Self, LeadpoolError> {
        Self::open_with(&StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        })
        .await
    }

    /// Open the database described by `config` and run migrations.
    pub async fn open_with(config: &StorageConfig) -> Result<Self, LeadpoolError> {
        let path = Path::new(&config.database_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LeadpoolError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| LeadpoolError::Storage {
                source: e.to_string().into(),
            })?;
        let mut db = Self { conn, reader: None };
        db.prepare(config.wal_mode, config.busy_timeout_ms).await?;
        db.reader = Some(open_reader(path, config.busy_timeout_ms).await?);
        debug!(path = %config.database_path, "database opened");
        Ok(db)
    }

    /// In-memory database, used by tests and dry runs.
    pub async fn open_in_memory() -> Result<Self, LeadpoolError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| LeadpoolError::Storage {
                source: e.to_string().into(),
            })?;
        let db = Self { conn, reader: None };
        db.prepare(false, StorageConfig::default().busy_timeout_ms)
            .await?;
        Ok(db)
    }

    /// The shared writer connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Connection for lookups. Falls back to the writer for in-memory databases.
    pub fn reader(&self) -> &tokio_rusqlite::Connection {
        self.reader.as_ref().unwrap_or(&self.conn)
    }

    /// Checkpoint the WAL and close both connections.
    pub async fn close(self) -> Result<(), LeadpoolError> {
        self.checkpoint().await?;
        fn closed(e: impl std::fmt::Display) -> LeadpoolError {
            LeadpoolError::Storage {
                source: e.to_string().into(),
            }
        }
        if let Some(reader) = self.reader {
            reader.close().await.map_err(closed)?;
        }
        self.conn.close().await.map_err(closed)?;
        debug!("database closed");
        Ok(())
    }

    /// Fold the WAL back into the main database file.
    pub async fn checkpoint(&self) -> Result<(), LeadpoolError> {
        self.conn
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn prepare(&self, wal_mode: bool, busy_timeout_ms: u64) -> Result<(), LeadpoolError> {
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                if wal_mode {
                    conn.pragma_update(None, "journal_mode", "WAL")?;
                }
                conn.pragma_update(None, "synchronous", "NORMAL")?;
                conn.pragma_update(None, "foreign_keys", "ON")?;
                conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        let applied = self
            .conn
            .call(|conn| -> Result<usize, refinery::Error> { run_migrations(conn) })
            .await
            .map_err(|e| match e {
                tokio_rusqlite::Error::Error(inner) => LeadpoolError::Storage {
                    source: Box::new(inner),
                },
                other => LeadpoolError::Storage {
                    source: other.to_string().into(),
                },
            })?;
        if applied > 0 {
            debug!(applied, "migrations applied");
        }
        Ok(())
    }
}

async fn open_reader(
    path: &Path,
    busy_timeout_ms: u64,
) -> Result<tokio_rusqlite::Connection, LeadpoolError> {
    let reader = tokio_rusqlite::Connection::open(path)
        .await
        .map_err(|e| LeadpoolError::Storage {
            source: e.to_string().into(),
        })?;
    reader
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.pragma_update(None, "query_only", "ON")?;
            conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
    Ok(reader)
}

/// Convert a tokio-rusqlite error into a [`LeadpoolError`].
///
/// SQLite `BUSY`/`LOCKED` means another writer held the lock past the busy
/// timeout and becomes the retryable [`LeadpoolError::Contention`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> LeadpoolError {
    match e {
        tokio_rusqlite::Error::Error(inner) => map_sqlite_err(inner),
        other => LeadpoolError::Storage {
            source: other.to_string().into(),
        },
    }
}

/// Convert a rusqlite error, classifying lock timeouts as contention.
pub fn map_sqlite_err(e: rusqlite::Error) -> LeadpoolError {
    match e.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => LeadpoolError::Contention {
            message: e.to_string(),
        },
        _ => LeadpoolError::Storage {
            source: Box::new(e),
        },
    }
}

/// Whether `e` is a UNIQUE/CHECK constraint violation.
pub(crate) fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}

/// Current time in the ISO 8601 format used by every timestamp column.
pub(crate) fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn open_creates_file_and_schema() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("pool.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        assert!(db_path.exists());

        let tables: Vec<String> = db
            .connection()
            .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
                let mut stmt = conn.prepare(
                    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'refinery%' AND name NOT LIKE 'sqlite%' ORDER BY name",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .unwrap();
        assert_eq!(tables, ["categories", "contacts", "leads", "worker_quotas"]);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn wal_mode_enabled() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("wal.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

        let mode: String = db
            .connection()
            .call(|conn| -> Result<String, rusqlite::Error> {
                conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))
            })
            .await
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn reopening_does_not_reapply_migrations() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("reopen.db");
        let path = db_path.to_str().unwrap();
        Database::open(path).await.unwrap().close().await.unwrap();
        let db = Database::open(path).await.unwrap();

        let applied: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row(
                    "SELECT COUNT(*) FROM refinery_schema_history",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(applied, 1);
    }

    #[test]
    fn busy_and_locked_are_contention() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".into()),
        );
        assert!(map_sqlite_err(busy).is_retryable());

        let locked = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        );
        assert!(map_sqlite_err(locked).is_retryable());

        let other = rusqlite::Error::QueryReturnedNoRows;
        assert!(!map_sqlite_err(other).is_retryable());
    }

    #[test]
    fn timestamps_are_utc_millis() {
        let ts = now_timestamp();
        assert_eq!(ts.len(), 24);
        assert!(ts.ends_with('Z'));
    }
}
