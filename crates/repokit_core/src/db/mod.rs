//! Durable store contract, SQLite bootstrap and schema migrations.
//!
//! # Responsibility
//! - Define the narrow store contract repositories persist through.
//! - Open and configure SQLite connections and apply migrations.
//! - Implement the store contract on top of SQLite.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Core code must not read/write application data before migrations succeed.
//! - A transaction closure returning `Err` leaves the store unchanged.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod driver;
pub mod migrations;
mod open;
pub mod sqlite_driver;

pub use driver::{DatabaseContext, DatabaseDriver, DatabaseModel};
pub use open::{open_db, open_db_in_memory};
pub use sqlite_driver::{SqliteDriver, SqliteModel};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// Persisted data cannot be converted to a valid model.
    InvalidData(String),
    /// The store refused the unit of work without an engine error.
    Rejected(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Rejected(message) => write!(f, "transaction rejected: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::InvalidData(_) => None,
            Self::Rejected(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
