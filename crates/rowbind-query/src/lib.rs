//! SQL statement generation for Rowbind.
//!
//! This crate is the statement-builder collaborator of the record core:
//! given a table and a column set it produces executable `Statement`s with
//! dialect-correct placeholders, and sanitizes parameters by declared
//! type. The record core decides *which* columns participate in a write;
//! this crate only decides how that write is spelled.

pub mod adapter;
pub mod dialect;

pub use adapter::SqlAdapter;
pub use dialect::{Dialect, quote_ident};
