//! Database connection management.
//!
//! [`Database`] owns a single SQLite connection behind `Arc<Mutex<_>>`. The
//! builder itself never manages connections; callers lock the handle for the
//! duration of one logical operation and hand the borrowed connection (or a
//! transaction) to [`crate::QueryBuilder::new`].

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use rusqlite::{Connection, Transaction};
use tracing::{debug, warn};

use crate::error::DbError;

/// Shared SQLite connection handle.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (creating if needed) the database file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::ConnectionError`] if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", path.display(), e)))?;

        // WAL mode for better concurrent access
        let _: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        debug!("Opened database at {}", path.display());
        Ok(Self::from_connection(conn))
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| DbError::ConnectionError(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Runs `f` with the locked connection.
    pub fn with_conn<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<DbError>,
    {
        let guard = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        f(&guard)
    }

    /// Runs `f` inside a transaction, committing on `Ok` and rolling back on `Err`.
    pub fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, E>,
        E: From<DbError>,
    {
        let mut guard = self.conn.lock().map_err(|_| DbError::Poisoned)?;
        let tx = guard.transaction().map_err(DbError::from)?;

        match f(&tx) {
            Ok(value) => {
                tx.commit().map_err(DbError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    warn!("Failed to roll back transaction: {}", rollback_err);
                } else {
                    debug!("Transaction rolled back");
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::executor::Executor;

    #[derive(Debug)]
    struct Failed;

    impl From<DbError> for Failed {
        fn from(_: DbError) -> Self {
            Failed
        }
    }

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)")
                .map_err(DbError::from)
        })
        .unwrap();
        db
    }

    fn count(db: &Database) -> usize {
        db.with_conn(|conn| Executor::query(conn, "SELECT id FROM t", &[]))
            .unwrap()
            .len()
    }

    #[test]
    fn test_transaction_commits() {
        let db = setup();
        db.transaction(|tx| Executor::execute(tx, "INSERT INTO t (name) VALUES (?)", &[json!("a")]))
            .unwrap();
        assert_eq!(count(&db), 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = setup();
        let result: Result<(), Failed> = db.transaction(|tx| {
            Executor::execute(tx, "INSERT INTO t (name) VALUES (?)", &[json!("a")])?;
            Err(Failed)
        });
        assert!(result.is_err());
        assert_eq!(count(&db), 0);
    }
}
