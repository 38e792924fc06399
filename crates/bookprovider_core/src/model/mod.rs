//! Book record model and caller-facing value containers.
//!
//! # Responsibility
//! - Define the `books` column allow-list and the typed `Book` read model.
//! - Provide `ContentValues`, the column/value map used by insert and update.
//!
//! # Invariants
//! - Column names outside `BookColumn::ALL` never reach generated SQL.
//! - `name` is the only column required on insert.

pub mod book;
pub mod values;
