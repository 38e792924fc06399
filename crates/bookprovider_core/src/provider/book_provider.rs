//! Book provider: identifier dispatch, insert policy and notification.
//!
//! # Responsibility
//! - Expose query/insert/update/delete/get_type over `content://` identifiers.
//! - Default `created_at`, `modified_at`, `isbn` and `author` on insert.
//! - Publish the affected identifier after each mutation.
//!
//! # Invariants
//! - Item identifiers always constrain statements by a bound `id = ?`.
//! - `modified_at` is never bumped implicitly on update.
//! - Store failures are returned as-is; nothing is retried.

use crate::config::{ConfigError, ProviderConfig};
use crate::db::{BookDatabase, DbError, OpenMode};
use crate::model::book::{BookColumn, BookValidationError, DEFAULT_AUTHOR, DEFAULT_ISBN};
use crate::model::values::{ContentValues, FieldValue};
use crate::notify::ChangeNotifier;
use crate::provider::cursor::BookCursor;
use crate::repo::book_repo::{resolve_columns, SqliteBookRepository};
use crate::repo::selection::{Selection, SortOrder};
use crate::uri::{BookUri, ContentKind, UriError, UriMatcher};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

pub type ProviderResult<T> = Result<T, ProviderError>;

#[derive(Debug)]
pub enum ProviderError {
    /// Identifier matched neither book form (or the wrong one).
    UnrecognizedIdentifier { uri: String, reason: UriError },
    Validation(BookValidationError),
    /// Projection or values named a column outside the allow-list.
    UnknownColumn(String),
    InvalidSortOrder(String),
    /// Caller filter could escape the item scoping or hold extra statements.
    InvalidSelection(String),
    /// The store rejected the new row.
    InsertFailed { uri: BookUri, source: rusqlite::Error },
    /// A statement failed to prepare or execute.
    Store(rusqlite::Error),
    /// The store could not be opened or brought to the expected schema.
    SchemaOpen(DbError),
    /// A row could not be decoded into the typed model.
    InvalidData(String),
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnrecognizedIdentifier { reason, .. } => write!(f, "{reason}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::UnknownColumn(column) => write!(f, "unknown column `{column}`"),
            Self::InvalidSortOrder(term) => write!(f, "invalid sort order term `{term}`"),
            Self::InvalidSelection(reason) => write!(f, "invalid selection: {reason}"),
            Self::InsertFailed { uri, source } => {
                write!(f, "failed to insert row into {uri}: {source}")
            }
            Self::Store(err) => write!(f, "store execution failed: {err}"),
            Self::SchemaOpen(err) => write!(f, "failed to open book store: {err}"),
            Self::InvalidData(message) => write!(f, "invalid book row: {message}"),
        }
    }
}

impl Error for ProviderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::UnrecognizedIdentifier { reason, .. } => Some(reason),
            Self::Validation(err) => Some(err),
            Self::InsertFailed { source, .. } => Some(source),
            Self::Store(err) => Some(err),
            Self::SchemaOpen(err) => Some(err),
            Self::UnknownColumn(_)
            | Self::InvalidSortOrder(_)
            | Self::InvalidSelection(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<BookValidationError> for ProviderError {
    fn from(value: BookValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for ProviderError {
    fn from(value: DbError) -> Self {
        Self::SchemaOpen(value)
    }
}

impl From<rusqlite::Error> for ProviderError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Store(value)
    }
}

/// Read request options. `Default` selects every column of every row,
/// ordered by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookQuery {
    /// Column names to return; `None` means all columns in table order.
    pub projection: Option<Vec<String>>,
    pub selection: Selection,
    /// `"<column> [ASC|DESC], ..."`; blank means `name ASC`.
    pub sort_order: Option<String>,
}

impl BookQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projection<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_sort_order(mut self, sort_order: impl Into<String>) -> Self {
        self.sort_order = Some(sort_order.into());
        self
    }
}

/// URI-addressed book store.
///
/// Owns the store handle and a notifier; both are injected at construction
/// and live as long as the provider.
pub struct BookProvider<N> {
    config: ProviderConfig,
    matcher: UriMatcher,
    database: BookDatabase,
    notifier: N,
    clock: fn() -> i64,
}

impl<N: ChangeNotifier> BookProvider<N> {
    /// Builds a provider over an already constructed database handle.
    pub fn new(
        config: ProviderConfig,
        database: BookDatabase,
        notifier: N,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let matcher = UriMatcher::new(config.authority.clone());
        Ok(Self {
            config,
            matcher,
            database,
            notifier,
            clock: epoch_millis,
        })
    }

    /// Builds a provider and its database handle from `config`.
    ///
    /// The store itself is opened lazily by the first operation.
    pub fn open(config: ProviderConfig, notifier: N) -> Result<Self, ConfigError> {
        let database = BookDatabase::new(config.location.clone(), config.schema_version);
        Self::new(config, database, notifier)
    }

    /// Replaces the epoch-millisecond clock used for insert timestamps.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn database(&self) -> &BookDatabase {
        &self.database
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn collection_uri(&self) -> BookUri {
        self.matcher.collection_uri()
    }

    /// Pure classification of `uri`.
    pub fn resolve_content_kind(&self, uri: &str) -> ProviderResult<ContentKind> {
        Ok(self.classify(uri)?.kind())
    }

    /// Configured content-kind string for `uri`.
    pub fn get_type(&self, uri: &str) -> ProviderResult<&str> {
        Ok(match self.resolve_content_kind(uri)? {
            ContentKind::Collection => self.config.collection_content_type.as_str(),
            ContentKind::Item => self.config.item_content_type.as_str(),
        })
    }

    /// Reads matching rows.
    ///
    /// # Errors
    /// - `UnrecognizedIdentifier`, `UnknownColumn`, `InvalidSortOrder` and
    ///   `InvalidSelection` before the store is touched.
    /// - `SchemaOpen` / `Store` from the store.
    pub fn query(&self, uri: &str, request: &BookQuery) -> ProviderResult<BookCursor> {
        let started_at = Instant::now();
        let target = self.classify(uri)?;
        let projection = resolve_projection(request.projection.as_deref())?;
        let sort_order = SortOrder::parse(request.sort_order.as_deref())
            .map_err(ProviderError::InvalidSortOrder)?;
        let selection = scoped_selection(&target, &request.selection)?;

        let result = self.database.with_connection(OpenMode::Read, |conn| {
            SqliteBookRepository::new(conn)
                .query(&projection, &selection, &sort_order)
                .map_err(ProviderError::from)
        });

        match result {
            Ok(rows) => {
                debug!(
                    "event=book_query module=provider status=ok uri={} rows={} duration_ms={}",
                    target,
                    rows.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(BookCursor::new(projection, rows, target))
            }
            Err(err) => Err(log_failure("book_query", &target, err)),
        }
    }

    /// Inserts one book through the collection identifier.
    ///
    /// Omitted `created_at`/`modified_at` get the same current timestamp,
    /// omitted `isbn` becomes `"Unknown ISBN"` and omitted `author` becomes
    /// `"Unknown Author"`.
    ///
    /// # Errors
    /// - `UnrecognizedIdentifier` for item identifiers.
    /// - `Validation(MissingName)` when `name` is absent; nothing is stored.
    /// - `Validation(InvalidId)` when an explicit `id` is not a positive
    ///   integer, since the returned identifier could not address it.
    /// - `InsertFailed` when the store rejects the row.
    pub fn insert(&self, uri: &str, values: &ContentValues) -> ProviderResult<BookUri> {
        let started_at = Instant::now();
        let target = self.classify(uri)?;
        if target.kind() != ContentKind::Collection {
            return Err(ProviderError::UnrecognizedIdentifier {
                uri: uri.to_string(),
                reason: UriError::ItemNotAllowed(target),
            });
        }

        let values = self.with_insert_defaults(values);
        if !values.contains_key(BookColumn::Name.as_str()) {
            warn!(
                "event=book_insert module=provider status=error uri={} error_code=missing_name",
                target
            );
            return Err(BookValidationError::MissingName.into());
        }
        let columns = resolve_columns(&values).map_err(ProviderError::UnknownColumn)?;
        check_explicit_id(&values)?;

        let result = self.database.with_connection(OpenMode::Write, |conn| {
            SqliteBookRepository::new(conn)
                .insert(&columns)
                .map_err(|source| ProviderError::InsertFailed {
                    uri: target.clone(),
                    source,
                })
        });

        match result {
            Ok(id) => {
                let inserted = target.with_appended_id(id);
                info!(
                    "event=book_insert module=provider status=ok uri={} duration_ms={}",
                    inserted,
                    started_at.elapsed().as_millis()
                );
                self.notifier.notify_change(&inserted);
                Ok(inserted)
            }
            Err(err) => Err(log_failure("book_insert", &target, err)),
        }
    }

    /// Sets `values` on matching rows and returns the affected count.
    ///
    /// No defaults are applied and `modified_at` is left alone unless the
    /// caller sets it. Observers are notified even when the count is zero.
    pub fn update(
        &self,
        uri: &str,
        values: &ContentValues,
        selection: &Selection,
    ) -> ProviderResult<usize> {
        let started_at = Instant::now();
        let target = self.classify(uri)?;
        if values.is_empty() {
            return Err(BookValidationError::EmptyValues.into());
        }
        let columns = resolve_columns(values).map_err(ProviderError::UnknownColumn)?;
        let selection = scoped_selection(&target, selection)?;

        let result = self.database.with_connection(OpenMode::Write, |conn| {
            SqliteBookRepository::new(conn)
                .update(&columns, &selection)
                .map_err(ProviderError::from)
        });

        let count = result.map_err(|err| log_failure("book_update", &target, err))?;
        info!(
            "event=book_update module=provider status=ok uri={} rows={} duration_ms={}",
            target,
            count,
            started_at.elapsed().as_millis()
        );
        self.notifier.notify_change(&target);
        Ok(count)
    }

    /// Removes matching rows and returns the removed count.
    ///
    /// A missing item id yields `Ok(0)`. Observers are notified regardless.
    pub fn delete(&self, uri: &str, selection: &Selection) -> ProviderResult<usize> {
        let started_at = Instant::now();
        let target = self.classify(uri)?;
        let selection = scoped_selection(&target, selection)?;

        let result = self.database.with_connection(OpenMode::Write, |conn| {
            SqliteBookRepository::new(conn)
                .delete(&selection)
                .map_err(ProviderError::from)
        });

        let count = result.map_err(|err| log_failure("book_delete", &target, err))?;
        info!(
            "event=book_delete module=provider status=ok uri={} rows={} duration_ms={}",
            target,
            count,
            started_at.elapsed().as_millis()
        );
        self.notifier.notify_change(&target);
        Ok(count)
    }

    fn classify(&self, uri: &str) -> ProviderResult<BookUri> {
        self.matcher.classify(uri).map_err(|reason| {
            warn!(
                "event=uri_match module=provider status=error error_code=unrecognized_uri reason={}",
                reason
            );
            ProviderError::UnrecognizedIdentifier {
                uri: uri.to_string(),
                reason,
            }
        })
    }

    fn with_insert_defaults(&self, values: &ContentValues) -> ContentValues {
        let mut values = values.clone();
        let now = (self.clock)();
        values.put_if_absent(BookColumn::CreatedAt.as_str(), now);
        values.put_if_absent(BookColumn::ModifiedAt.as_str(), now);
        values.put_if_absent(BookColumn::Isbn.as_str(), DEFAULT_ISBN);
        values.put_if_absent(BookColumn::Author.as_str(), DEFAULT_AUTHOR);
        values
    }
}

fn resolve_projection(projection: Option<&[String]>) -> ProviderResult<Vec<BookColumn>> {
    match projection {
        None => Ok(BookColumn::ALL.to_vec()),
        Some(names) => names
            .iter()
            .map(|name| {
                BookColumn::parse(name).ok_or_else(|| ProviderError::UnknownColumn(name.clone()))
            })
            .collect(),
    }
}

fn scoped_selection(target: &BookUri, selection: &Selection) -> ProviderResult<Selection> {
    selection.validate().map_err(|reason| {
        warn!(
            "event=selection_check module=provider status=error uri={} error_code=invalid_selection reason={}",
            target, reason
        );
        ProviderError::InvalidSelection(reason)
    })?;
    Ok(match target.id() {
        Some(id) => selection.clone().and_id(id),
        None => selection.clone(),
    })
}

/// `NULL` lets the store assign the id; anything else must be `> 0`.
fn check_explicit_id(values: &ContentValues) -> Result<(), BookValidationError> {
    match values.get(BookColumn::Id.as_str()) {
        None | Some(FieldValue::Null) => Ok(()),
        Some(FieldValue::Integer(id)) if *id > 0 => Ok(()),
        Some(FieldValue::Integer(id)) => Err(BookValidationError::InvalidId(id.to_string())),
        Some(other) => Err(BookValidationError::InvalidId(format!(
            "{} value",
            other.type_name()
        ))),
    }
}

fn log_failure(event: &str, target: &BookUri, err: ProviderError) -> ProviderError {
    warn!(
        "event={} module=provider status=error uri={} error={}",
        event, target, err
    );
    err
}

fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
