//! Core of the book content provider.
//! URI-addressed CRUD over a single SQLite `books` table, with change
//! notification after every mutation.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod provider;
pub mod repo;
pub mod uri;

pub use config::{ConfigError, ProviderConfig};
pub use db::{BookDatabase, DbError, DbResult, OpenMode, StoreLocation};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::book::{Book, BookColumn, BookId, BookValidationError, DEFAULT_AUTHOR, DEFAULT_ISBN};
pub use model::values::{ContentValues, FieldValue};
pub use notify::{ChangeNotifier, ChangeRecorder, LogNotifier};
pub use provider::book_provider::{BookProvider, BookQuery, ProviderError, ProviderResult};
pub use provider::cursor::{BookCursor, CursorRow};
pub use repo::selection::{Selection, SortDirection, SortOrder};
pub use uri::{BookUri, ContentKind, UriError, UriMatcher};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
