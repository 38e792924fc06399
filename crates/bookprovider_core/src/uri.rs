//! Book identifier parsing and classification.
//!
//! # Responsibility
//! - Match `content://<authority>/books` and `content://<authority>/books/<id>`.
//! - Render canonical identifiers, including the item URI for a new row.
//!
//! # Invariants
//! - Only the configured authority matches.
//! - Empty path segments are ignored; query string and fragment never take
//!   part in matching.
//! - `<id>` is ASCII digits only and must fit in `i64`.

use crate::model::book::BookId;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// URI scheme accepted by the matcher.
pub const CONTENT_SCHEME: &str = "content";
/// Path segment naming the book collection.
pub const BOOKS_PATH: &str = "books";

/// Classification of a matched identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Collection,
    Item,
}

/// Identifier that matched one of the two book forms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BookUri {
    authority: String,
    id: Option<BookId>,
}

impl BookUri {
    pub fn collection(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            id: None,
        }
    }

    pub fn item(authority: impl Into<String>, id: BookId) -> Self {
        Self {
            authority: authority.into(),
            id: Some(id),
        }
    }

    /// Item identifier for `id` under the same authority.
    pub fn with_appended_id(&self, id: BookId) -> Self {
        Self::item(self.authority.clone(), id)
    }

    /// Collection identifier under the same authority.
    pub fn to_collection(&self) -> Self {
        Self::collection(self.authority.clone())
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Row id for item identifiers.
    pub fn id(&self) -> Option<BookId> {
        self.id
    }

    pub fn kind(&self) -> ContentKind {
        match self.id {
            Some(_) => ContentKind::Item,
            None => ContentKind::Collection,
        }
    }
}

impl Display for BookUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{CONTENT_SCHEME}://{}/{BOOKS_PATH}", self.authority)?;
        if let Some(id) = self.id {
            write!(f, "/{id}")?;
        }
        Ok(())
    }
}

/// Reasons an identifier matched neither book form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    MissingScheme(String),
    AuthorityMismatch { expected: String, found: String },
    UnknownPath(String),
    /// Matched the item form where only the collection form is accepted.
    ItemNotAllowed(BookUri),
}

impl Display for UriError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingScheme(uri) => {
                write!(f, "unknown URI {uri}: expected `{CONTENT_SCHEME}://` scheme")
            }
            Self::AuthorityMismatch { expected, found } => {
                write!(f, "unknown URI authority `{found}`, expected `{expected}`")
            }
            Self::UnknownPath(path) => write!(f, "unknown URI path `/{path}`"),
            Self::ItemNotAllowed(uri) => {
                write!(f, "unknown URI {uri}: only the collection form is accepted")
            }
        }
    }
}

impl Error for UriError {}

/// Two-entry matcher bound to one authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriMatcher {
    authority: String,
}

impl UriMatcher {
    pub fn new(authority: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn collection_uri(&self) -> BookUri {
        BookUri::collection(self.authority.clone())
    }

    /// Matches `raw` against the collection and item forms.
    pub fn classify(&self, raw: &str) -> Result<BookUri, UriError> {
        let trimmed = raw.trim();
        let rest = trimmed
            .strip_prefix(CONTENT_SCHEME)
            .and_then(|rest| rest.strip_prefix("://"))
            .ok_or_else(|| UriError::MissingScheme(trimmed.to_string()))?;
        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        let rest = &rest[..end];

        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        if authority != self.authority {
            return Err(UriError::AuthorityMismatch {
                expected: self.authority.clone(),
                found: authority.to_string(),
            });
        }

        let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();
        match segments.as_slice() {
            [BOOKS_PATH] => Ok(self.collection_uri()),
            [BOOKS_PATH, id] => parse_id(id)
                .map(|id| BookUri::item(self.authority.clone(), id))
                .ok_or_else(|| UriError::UnknownPath(path.to_string())),
            _ => Err(UriError::UnknownPath(path.to_string())),
        }
    }
}

fn parse_id(segment: &str) -> Option<BookId> {
    if !segment.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    segment.parse::<BookId>().ok()
}
