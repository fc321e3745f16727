//! SQLite backing store, connection bootstrap and schema migrations.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the finance tables.
//! - Apply schema migrations in deterministic order.
//! - Expose the `BackingStore` contract consumed by the in-memory tables.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - Tables must not read/write data before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;
mod store;

pub use open::{create_db_file, open_db, open_db_in_memory};
pub use store::{BackingStore, SqliteStore};

pub type StoreResult<T> = Result<T, StoreError>;

/// Backing-store failure: connection, query or schema-version problems.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// A statement was issued while no database file is connected.
    NotConnected,
    /// `create_file` refuses to replace an existing database file.
    FileExists(PathBuf),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A result set cannot be converted into rows.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::NotConnected => write!(f, "no database file is connected"),
            Self::FileExists(path) => {
                write!(f, "database file already exists: {}", path.display())
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::InvalidData(message) => write!(f, "invalid result set: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::NotConnected => None,
            Self::FileExists(_) => None,
            Self::UnsupportedSchemaVersion { .. } => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
