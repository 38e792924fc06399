//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file, read-only file or in-memory SQLite connections.
//! - Configure connection settings required by the provider.
//! - Run the schema check before returning a usable connection.
//!
//! # Invariants
//! - Returned writable connections carry the expected schema version.
//! - Returned read-only connections are only handed out when no schema
//!   change would be needed.

use super::schema::{ensure_schema, schema_version};
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::{Connection, DatabaseName, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (creating if needed) a SQLite database file at `expected_version`.
///
/// Missing parent directories are created first.
///
/// # Errors
/// - `ReadOnlyStore` when SQLite could only open the file read-only.
///
/// # Side effects
/// - May create the table or destructively recreate it on upgrade.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(path: impl AsRef<Path>, expected_version: u32) -> DbResult<Connection> {
    let path = path.as_ref();
    open_logged("file", || {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut conn = Connection::open(path)?;
        if conn.is_readonly(DatabaseName::Main)? {
            return Err(DbError::ReadOnlyStore(path.to_path_buf()));
        }
        bootstrap_connection(&mut conn, expected_version)?;
        Ok(conn)
    })
}

/// Opens a private in-memory database at `expected_version`.
pub fn open_db_in_memory(expected_version: u32) -> DbResult<Connection> {
    open_logged("memory", || {
        let mut conn = Connection::open_in_memory()?;
        bootstrap_connection(&mut conn, expected_version)?;
        Ok(conn)
    })
}

/// Opens an existing database file without write access.
///
/// # Errors
/// - `ReadOnlySchemaMismatch` when the file is not already at
///   `expected_version`, since a read-only handle cannot migrate it.
pub fn open_db_read_only(path: impl AsRef<Path>, expected_version: u32) -> DbResult<Connection> {
    let path = path.as_ref();
    open_logged("read_only", || {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db_version = schema_version(&conn)?;
        if db_version != expected_version {
            return Err(DbError::ReadOnlySchemaMismatch {
                db_version,
                expected: expected_version,
            });
        }
        Ok(conn)
    })
}

fn open_logged(
    mode: &'static str,
    open: impl FnOnce() -> DbResult<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!("event=db_open module=db status=start mode={mode}");

    match open() {
        Ok(conn) => {
            info!(
                "event=db_open module=db status=ok mode={} duration_ms={}",
                mode,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code={} error={}",
                mode,
                started_at.elapsed().as_millis(),
                error_code(&err),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(conn: &mut Connection, expected_version: u32) -> DbResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    ensure_schema(conn, expected_version)?;
    Ok(())
}

fn error_code(err: &DbError) -> &'static str {
    match err {
        DbError::Sqlite(_) => "db_open_failed",
        DbError::Io(_) => "db_dir_failed",
        DbError::ReadOnlyStore(_) => "db_read_only",
        DbError::InvalidSchemaVersion(_) => "db_invalid_version",
        DbError::UnsupportedSchemaVersion { .. } => "db_version_too_new",
        DbError::ReadOnlySchemaMismatch { .. } => "db_read_only_mismatch",
    }
}
