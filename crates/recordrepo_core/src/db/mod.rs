//! SQLite storage bootstrap and shared connection handle.
//!
//! # Responsibility
//! - Open and configure SQLite connections for repository use.
//! - Share one connection between a container, its builders and singletons.
//!
//! # Invariants
//! - Returned handles have `foreign_keys=ON`.
//! - The connection lock is held for one statement at a time, never across
//!   a nested query.

use parking_lot::{Mutex, MutexGuard};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Cloneable handle to one configured SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Wraps an already configured connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Locks the connection for the duration of the returned guard.
    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }

    /// Runs a batch of SQL statements, typically schema setup.
    pub fn execute_batch(&self, sql: &str) -> DbResult<()> {
        self.lock().execute_batch(sql)?;
        Ok(())
    }

    /// Returns whether both handles point at the same connection.
    pub fn same_connection(&self, other: &Database) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}
