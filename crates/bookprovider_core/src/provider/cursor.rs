//! Query results.
//!
//! Rows are read by a single statement and held in memory, so iteration can
//! be restarted any number of times without touching the store again.

use crate::model::book::{Book, BookColumn};
use crate::model::values::FieldValue;
use crate::provider::book_provider::ProviderError;
use crate::repo::book_repo::RowValues;
use crate::uri::BookUri;

/// Result set of one `query` call.
#[derive(Debug, Clone, PartialEq)]
pub struct BookCursor {
    columns: Vec<BookColumn>,
    rows: Vec<RowValues>,
    notification_uri: BookUri,
}

impl BookCursor {
    pub(crate) fn new(columns: Vec<BookColumn>, rows: Vec<RowValues>, notification_uri: BookUri) -> Self {
        Self {
            columns,
            rows,
            notification_uri,
        }
    }

    /// Projected columns, in result order.
    pub fn columns(&self) -> &[BookColumn] {
        &self.columns
    }

    pub fn column_index(&self, column: BookColumn) -> Option<usize> {
        self.columns.iter().position(|candidate| *candidate == column)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Identifier whose change notifications invalidate this result.
    pub fn notification_uri(&self) -> &BookUri {
        &self.notification_uri
    }

    pub fn row(&self, index: usize) -> Option<CursorRow<'_>> {
        self.rows.get(index).map(|values| CursorRow {
            columns: &self.columns,
            values,
        })
    }

    /// Iterates from the first row. Each call starts over.
    pub fn iter(&self) -> impl Iterator<Item = CursorRow<'_>> + '_ {
        self.rows.iter().map(|values| CursorRow {
            columns: &self.columns,
            values,
        })
    }

    /// Decodes every row; requires the full projection.
    pub fn to_books(&self) -> Result<Vec<Book>, ProviderError> {
        self.iter().map(|row| row.to_book()).collect()
    }
}

/// Borrowed view of one result row.
#[derive(Debug, Clone, Copy)]
pub struct CursorRow<'c> {
    columns: &'c [BookColumn],
    values: &'c [FieldValue],
}

impl<'c> CursorRow<'c> {
    /// `None` when `column` was not projected.
    pub fn get(&self, column: BookColumn) -> Option<&'c FieldValue> {
        let index = self.columns.iter().position(|candidate| *candidate == column)?;
        self.values.get(index)
    }

    pub fn get_i64(&self, column: BookColumn) -> Option<i64> {
        self.get(column).and_then(FieldValue::as_i64)
    }

    pub fn get_str(&self, column: BookColumn) -> Option<&'c str> {
        self.get(column).and_then(FieldValue::as_str)
    }

    pub fn values(&self) -> &'c [FieldValue] {
        self.values
    }

    pub fn to_book(&self) -> Result<Book, ProviderError> {
        let id = match self.require(BookColumn::Id)? {
            FieldValue::Integer(id) => *id,
            other => return Err(invalid_type(BookColumn::Id, other)),
        };

        Ok(Book {
            id,
            name: self.optional_text(BookColumn::Name)?,
            isbn: self.optional_text(BookColumn::Isbn)?,
            author: self.optional_text(BookColumn::Author)?,
            created_at: self.optional_integer(BookColumn::CreatedAt)?,
            modified_at: self.optional_integer(BookColumn::ModifiedAt)?,
        })
    }

    fn require(&self, column: BookColumn) -> Result<&'c FieldValue, ProviderError> {
        self.get(column).ok_or_else(|| {
            ProviderError::InvalidData(format!("column `{column}` is not in the projection"))
        })
    }

    fn optional_text(&self, column: BookColumn) -> Result<Option<String>, ProviderError> {
        match self.require(column)? {
            FieldValue::Null => Ok(None),
            FieldValue::Text(value) => Ok(Some(value.clone())),
            other => Err(invalid_type(column, other)),
        }
    }

    fn optional_integer(&self, column: BookColumn) -> Result<Option<i64>, ProviderError> {
        match self.require(column)? {
            FieldValue::Null => Ok(None),
            FieldValue::Integer(value) => Ok(Some(*value)),
            other => Err(invalid_type(column, other)),
        }
    }
}

impl<'c> IntoIterator for &'c BookCursor {
    type Item = CursorRow<'c>;
    type IntoIter = Box<dyn Iterator<Item = CursorRow<'c>> + 'c>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

fn invalid_type(column: BookColumn, value: &FieldValue) -> ProviderError {
    ProviderError::InvalidData(format!(
        "unexpected {} value in books.{column}",
        value.type_name()
    ))
}
