//! Lazily opened, reusable store handle.
//!
//! # Responsibility
//! - Defer opening the database until the first operation needs it.
//! - Reuse one connection across calls for the owner's whole lifetime.
//! - Fall back to a read-only connection for reads when the store cannot be
//!   opened for writing.
//!
//! # Invariants
//! - At most one connection is held at a time.
//! - A read-only connection is upgraded to read-write on the next write; if
//!   that reopen fails the read-only connection stays held.
//! - Dropping the `BookDatabase` closes the connection.

use super::open::{open_db, open_db_in_memory, open_db_read_only};
use super::{DbError, DbResult};
use log::warn;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Where the book store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    /// Private to one `BookDatabase`; contents vanish on close.
    Memory,
}

impl StoreLocation {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

/// Access an operation needs from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

impl OpenMode {
    fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
        }
    }
}

struct OpenConnection {
    conn: Connection,
    writable: bool,
}

/// Owner of the store connection and its schema lifecycle.
///
/// Construct once at service startup and share with the provider; nothing
/// touches the disk until the first `with_connection` (or `open`) call.
pub struct BookDatabase {
    location: StoreLocation,
    schema_version: u32,
    slot: Mutex<Option<OpenConnection>>,
}

impl BookDatabase {
    pub fn new(location: StoreLocation, schema_version: u32) -> Self {
        Self {
            location,
            schema_version,
            slot: Mutex::new(None),
        }
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Whether a connection is currently held.
    pub fn is_open(&self) -> bool {
        self.lock_slot().is_some()
    }

    /// Whether the held connection accepts writes. `false` when closed.
    pub fn is_writable(&self) -> bool {
        self.lock_slot()
            .as_ref()
            .is_some_and(|open| open.writable)
    }

    /// Opens the store eagerly so schema errors surface at startup.
    pub fn open(&self, mode: OpenMode) -> DbResult<()> {
        self.with_connection(mode, |_| Ok::<(), DbError>(()))
    }

    /// Runs `f` against the store connection, opening it first if needed.
    ///
    /// Calls are serialized on the single connection.
    pub fn with_connection<T, E>(
        &self,
        mode: OpenMode,
        f: impl FnOnce(&Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let mut slot = self.lock_slot();
        let open = match slot.take() {
            Some(open) if open.writable || mode == OpenMode::Read => open,
            held => match self.open_connection(mode) {
                Ok(reopened) => reopened,
                Err(err) => {
                    // Keep serving reads from the old handle.
                    *slot = held;
                    return Err(err.into());
                }
            },
        };
        let open = slot.insert(open);
        f(&open.conn)
    }

    /// Drops the held connection. The next operation reopens it.
    pub fn close(&self) {
        *self.lock_slot() = None;
    }

    fn lock_slot(&self) -> MutexGuard<'_, Option<OpenConnection>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open_connection(&self, mode: OpenMode) -> DbResult<OpenConnection> {
        let writable = match &self.location {
            StoreLocation::File(path) => open_db(path, self.schema_version),
            StoreLocation::Memory => open_db_in_memory(self.schema_version),
        };

        match (writable, &self.location) {
            (Ok(conn), _) => Ok(OpenConnection {
                conn,
                writable: true,
            }),
            (
                Err(err @ (DbError::Sqlite(_) | DbError::Io(_) | DbError::ReadOnlyStore(_))),
                StoreLocation::File(path),
            )
                if mode == OpenMode::Read =>
            {
                warn!(
                    "event=db_open module=db status=fallback mode={} error={}",
                    mode.as_str(),
                    err
                );
                let conn = open_db_read_only(path, self.schema_version)?;
                Ok(OpenConnection {
                    conn,
                    writable: false,
                })
            }
            (Err(err), _) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BookDatabase, OpenConnection, OpenMode, StoreLocation};
    use crate::db::{open_db, open_db_read_only, DbError};

    #[test]
    fn nothing_is_opened_until_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lazy").join("books.db");
        let db = BookDatabase::new(StoreLocation::file(&path), 1);

        assert!(!db.is_open());
        assert!(!path.exists());

        db.open(OpenMode::Read).unwrap();
        assert!(db.is_open());
        assert!(db.is_writable());
        assert!(path.exists());
    }

    #[test]
    fn connection_is_reused_across_calls() {
        let db = BookDatabase::new(StoreLocation::Memory, 1);

        db.with_connection(OpenMode::Write, |conn| {
            conn.execute("INSERT INTO books (name) VALUES ('Dune');", [])
                .map_err(DbError::from)
        })
        .unwrap();

        // A second in-memory open would start empty.
        let count: i64 = db
            .with_connection(OpenMode::Read, |conn| {
                conn.query_row("SELECT COUNT(*) FROM books;", [], |row| row.get(0))
                    .map_err(DbError::from)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn close_releases_connection() {
        let db = BookDatabase::new(StoreLocation::Memory, 1);
        db.open(OpenMode::Write).unwrap();
        db.close();
        assert!(!db.is_open());
    }

    #[test]
    fn invalid_version_fails_on_first_use() {
        let db = BookDatabase::new(StoreLocation::Memory, 0);
        let err = db.open(OpenMode::Write).unwrap_err();
        assert!(matches!(err, DbError::InvalidSchemaVersion(0)));
        assert!(!db.is_open());
    }

    fn hold_read_only(db: &BookDatabase, path: &std::path::Path) {
        let conn = open_db_read_only(path, db.schema_version()).unwrap();
        *db.lock_slot() = Some(OpenConnection {
            conn,
            writable: false,
        });
    }

    fn count_books(db: &BookDatabase) -> i64 {
        db.with_connection(OpenMode::Read, |conn| {
            conn.query_row("SELECT COUNT(*) FROM books;", [], |row| row.get(0))
                .map_err(DbError::from)
        })
        .unwrap()
    }

    #[test]
    fn read_only_handle_serves_reads_and_reopens_for_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.db");
        drop(open_db(&path, 1).unwrap());
        let db = BookDatabase::new(StoreLocation::file(&path), 1);
        hold_read_only(&db, &path);

        assert_eq!(count_books(&db), 0);
        assert!(db.is_open());
        assert!(!db.is_writable());

        db.with_connection(OpenMode::Write, |conn| {
            conn.execute("INSERT INTO books (name) VALUES ('Dune');", [])
                .map_err(DbError::from)
        })
        .unwrap();
        assert!(db.is_writable());
        assert_eq!(count_books(&db), 1);
    }

    #[test]
    fn failed_write_reopen_keeps_read_only_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("books.db");
        let conn = open_db(&path, 1).unwrap();
        conn.execute("INSERT INTO books (name) VALUES ('Dune');", [])
            .unwrap();
        let db = BookDatabase::new(StoreLocation::file(&path), 1);
        hold_read_only(&db, &path);

        // A newer on-disk version makes the read-write open fail.
        conn.execute_batch("PRAGMA user_version = 9;").unwrap();
        drop(conn);

        let err = db.open(OpenMode::Write).unwrap_err();
        assert!(matches!(err, DbError::UnsupportedSchemaVersion { .. }));
        assert!(db.is_open());
        assert!(!db.is_writable());
        assert_eq!(count_books(&db), 1);
    }
}
