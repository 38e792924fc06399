//! SQLite statements over the `books` table.

use crate::db::schema::BOOKS_TABLE;
use crate::model::book::BookColumn;
use crate::model::values::{ContentValues, FieldValue};
use crate::repo::selection::{Selection, SortOrder};
use rusqlite::types::{ToSql, Value};
use rusqlite::{params_from_iter, Connection};

/// Raw rows in projection order.
pub type RowValues = Vec<FieldValue>;

/// Statement executor bound to one open connection.
pub struct SqliteBookRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBookRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Selects `projection` columns of matching rows.
    pub fn query(
        &self,
        projection: &[BookColumn],
        selection: &Selection,
        sort_order: &SortOrder,
    ) -> rusqlite::Result<Vec<RowValues>> {
        let columns = projection
            .iter()
            .map(|column| column.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {columns} FROM {BOOKS_TABLE}{}{};",
            selection.where_sql(),
            sort_order.order_by_sql()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(selection.args()))?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(projection.len());
            for index in 0..projection.len() {
                values.push(FieldValue::from(row.get::<_, Value>(index)?));
            }
            result.push(values);
        }
        Ok(result)
    }

    /// Inserts one row built from `values` and returns its rowid.
    ///
    /// Keys must already be validated against the allow-list.
    pub fn insert(&self, values: &[(BookColumn, &FieldValue)]) -> rusqlite::Result<i64> {
        let sql = if values.is_empty() {
            format!("INSERT INTO {BOOKS_TABLE} DEFAULT VALUES;")
        } else {
            let columns = values
                .iter()
                .map(|(column, _)| column.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("INSERT INTO {BOOKS_TABLE} ({columns}) VALUES ({placeholders});")
        };

        let params = values.iter().map(|(_, value)| *value as &dyn ToSql);
        self.conn.execute(&sql, params_from_iter(params))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Applies `values` to matching rows and returns the affected count.
    ///
    /// `values` must be non-empty.
    pub fn update(
        &self,
        values: &[(BookColumn, &FieldValue)],
        selection: &Selection,
    ) -> rusqlite::Result<usize> {
        let assignments = values
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {BOOKS_TABLE} SET {assignments}{};",
            selection.where_sql()
        );

        let params = values
            .iter()
            .map(|(_, value)| *value as &dyn ToSql)
            .chain(selection.args().iter().map(|value| value as &dyn ToSql));
        self.conn.execute(&sql, params_from_iter(params))
    }

    /// Removes matching rows and returns the removed count.
    pub fn delete(&self, selection: &Selection) -> rusqlite::Result<usize> {
        let sql = format!("DELETE FROM {BOOKS_TABLE}{};", selection.where_sql());
        self.conn
            .execute(&sql, params_from_iter(selection.args()))
    }
}

/// Resolves `values` keys against the allow-list, keeping caller order.
///
/// Returns the first unknown key on failure.
pub fn resolve_columns(values: &ContentValues) -> Result<Vec<(BookColumn, &FieldValue)>, String> {
    values
        .iter()
        .map(|(key, value)| {
            BookColumn::parse(key)
                .map(|column| (column, value))
                .ok_or_else(|| key.clone())
        })
        .collect()
}
