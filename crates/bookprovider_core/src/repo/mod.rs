//! Persistence layer for the `books` table.
//!
//! # Responsibility
//! - Turn allow-listed columns, selections and sort orders into SQL.
//! - Execute exactly one statement per call.
//!
//! # Invariants
//! - Only `BookColumn` names and fixed keywords are formatted into SQL text;
//!   all values travel as bound parameters.

pub mod book_repo;
pub mod selection;
