//! SQLite storage bootstrap and schema lifecycle.
//!
//! # Responsibility
//! - Open and configure SQLite connections for the book store.
//! - Create the `books` table on first open and recreate it on upgrade.
//! - Own the lazily opened, reusable store handle (`BookDatabase`).
//!
//! # Invariants
//! - Schema version is tracked via `PRAGMA user_version`.
//! - No caller reads or writes `books` before the schema check succeeds.
//! - Upgrades are destructive: every stored row is dropped.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

mod lifecycle;
mod open;
pub mod schema;

pub use lifecycle::{BookDatabase, OpenMode, StoreLocation};
pub use open::{open_db, open_db_in_memory, open_db_read_only};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    Io(std::io::Error),
    /// The file could only be opened read-only (permissions or media).
    ReadOnlyStore(PathBuf),
    /// Expected schema versions start at 1.
    InvalidSchemaVersion(u32),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// A read-only handle cannot create or upgrade the table.
    ReadOnlySchemaMismatch {
        db_version: u32,
        expected: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "storage i/o error: {err}"),
            Self::ReadOnlyStore(path) => {
                write!(f, "database `{}` is not writable", path.display())
            }
            Self::InvalidSchemaVersion(version) => {
                write!(f, "schema version must be at least 1, got {version}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::ReadOnlySchemaMismatch {
                db_version,
                expected,
            } => write!(
                f,
                "read-only database has schema version {db_version}, expected {expected}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::ReadOnlyStore(_)
            | Self::InvalidSchemaVersion(_)
            | Self::UnsupportedSchemaVersion { .. }
            | Self::ReadOnlySchemaMismatch { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<std::io::Error> for DbError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
