//! URI-addressed CRUD over the book store.
//!
//! # Responsibility
//! - Classify identifiers and dispatch to the matching statement.
//! - Apply insert defaults and validation.
//! - Notify observers after every mutation.
//!
//! # Invariants
//! - Identifier classification happens before the store is opened.
//! - update/delete notify even when no row changed; insert notifies only on
//!   success.

pub mod book_provider;
pub mod cursor;
