//! Book domain model.
//!
//! # Responsibility
//! - Define the six-column `books` allow-list.
//! - Provide the typed `Book` read model decoded from query rows.
//! - Own insert-time validation errors.
//!
//! # Invariants
//! - `id` is the store rowid; it is assigned on insert and never reused.
//! - `created_at` and `modified_at` are Unix epoch milliseconds.
//! - `modified_at` is only changed by callers, never implicitly.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Stored `isbn` when insert omits it.
pub const DEFAULT_ISBN: &str = "Unknown ISBN";
/// Stored `author` when insert omits it.
pub const DEFAULT_AUTHOR: &str = "Unknown Author";

/// Row id of one stored book.
pub type BookId = i64;

/// Column allow-list for the `books` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookColumn {
    Id,
    Name,
    Isbn,
    Author,
    CreatedAt,
    ModifiedAt,
}

impl BookColumn {
    /// All columns in table order. Also the default query projection.
    pub const ALL: [BookColumn; 6] = [
        Self::Id,
        Self::Name,
        Self::Isbn,
        Self::Author,
        Self::CreatedAt,
        Self::ModifiedAt,
    ];

    /// Column name as it appears in SQL.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Isbn => "isbn",
            Self::Author => "author",
            Self::CreatedAt => "created_at",
            Self::ModifiedAt => "modified_at",
        }
    }

    /// Resolves a caller-supplied column name. Matching is exact.
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|column| column.as_str() == value)
    }
}

impl Display for BookColumn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of one `books` row.
///
/// Every column except `id` is nullable in storage, so the read model keeps
/// them optional rather than inventing values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub name: Option<String>,
    pub isbn: Option<String>,
    pub author: Option<String>,
    /// Unix epoch milliseconds.
    pub created_at: Option<i64>,
    /// Unix epoch milliseconds.
    pub modified_at: Option<i64>,
}

/// Insert/update payload violations detected before touching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BookValidationError {
    /// Insert payload has no `name` key.
    MissingName,
    /// Update payload has no columns to set.
    EmptyValues,
    /// Explicit insert `id` is not a positive integer.
    InvalidId(String),
}

impl Display for BookValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "book name required"),
            Self::EmptyValues => write!(f, "update requires at least one column value"),
            Self::InvalidId(value) => {
                write!(f, "book id must be a positive integer, got {value}")
            }
        }
    }
}

impl Error for BookValidationError {}
