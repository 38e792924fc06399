//! `books` table definition and version handling.
//!
//! # Invariants
//! - Version 0 means "never initialized": the table is created.
//! - A lower persisted version drops and recreates the table, losing data.
//! - A higher persisted version is rejected; there is no downgrade.
//! - Schema changes and the `user_version` bump commit atomically.

use crate::db::{DbError, DbResult};
use log::{info, warn};
use rusqlite::Connection;

/// Name of the single table owned by the provider.
pub const BOOKS_TABLE: &str = "books";

/// Schema version compiled into this crate.
pub const DEFAULT_SCHEMA_VERSION: u32 = 1;

const CREATE_BOOKS_SQL: &str = "CREATE TABLE books (
    id INTEGER PRIMARY KEY,
    name TEXT,
    isbn TEXT,
    author TEXT,
    created_at INTEGER,
    modified_at INTEGER
);";

const DROP_BOOKS_SQL: &str = "DROP TABLE IF EXISTS books;";

/// What `ensure_schema` had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaChange {
    Unchanged,
    Created,
    Recreated { from_version: u32 },
}

/// Brings the connection to `expected` schema version.
pub fn ensure_schema(conn: &mut Connection, expected: u32) -> DbResult<SchemaChange> {
    if expected == 0 {
        return Err(DbError::InvalidSchemaVersion(expected));
    }

    let current = schema_version(conn)?;
    if current > expected {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: current,
            latest_supported: expected,
        });
    }
    if current == expected {
        return Ok(SchemaChange::Unchanged);
    }

    let tx = conn.transaction()?;
    let change = if current == 0 {
        tx.execute_batch(CREATE_BOOKS_SQL)?;
        SchemaChange::Created
    } else {
        warn!(
            "event=schema_upgrade module=db status=start from_version={} to_version={} data_loss=true",
            current, expected
        );
        tx.execute_batch(DROP_BOOKS_SQL)?;
        tx.execute_batch(CREATE_BOOKS_SQL)?;
        SchemaChange::Recreated {
            from_version: current,
        }
    };
    tx.execute_batch(&format!("PRAGMA user_version = {expected};"))?;
    tx.commit()?;

    match change {
        SchemaChange::Created => {
            info!("event=schema_create module=db status=ok version={expected}")
        }
        SchemaChange::Recreated { from_version } => info!(
            "event=schema_upgrade module=db status=ok from_version={from_version} to_version={expected}"
        ),
        SchemaChange::Unchanged => {}
    }

    Ok(change)
}

/// Reads `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
