//! Core types and traits for Rowbind.
//!
//! `rowbind-core` is the **foundation layer** for the workspace. It holds
//! the record abstraction and the contracts everything else plugs into.
//!
//! # Role In The Architecture
//!
//! - **Record core**: `Schema`, `RecordType`, and `Record` implement the
//!   read-modify-validate-write lifecycle of a single storage row.
//! - **Data model**: `Row`, `Value`, and `SqlType` represent field values
//!   and query inputs/outputs shared across all crates.
//! - **Contract layer**: `Connection` and `Adapter` are the capability
//!   interfaces a storage backend implements to persist records.
//! - **Structured concurrency**: re-exports `Cx` and `Outcome` from
//!   asupersync so every persistence operation is cancel-correct.
//!
//! # Who Uses This Crate
//!
//! - `rowbind-query` implements `Adapter` for SQL dialects.
//! - `rowbind-memory` implements `Connection` over in-memory tables.
//! - Applications should normally use the `rowbind` facade instead.

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod changes;
pub mod connection;
pub mod error;
pub mod field;
pub mod record;
pub mod row;
pub mod types;
pub mod validate;
pub mod value;

pub use changes::ChangeSet;
pub use connection::{Adapter, Connection, Plan, QueryResult, Statement};
pub use error::{ConversionError, Error, QueryError, Result, ValidationError};
pub use field::{FieldDef, Schema};
pub use record::{
    QUERY_ERROR_KEY, Record, RecordType, RecordTypeBuilder, ValuesView, WHOLE_RECORD_KEY,
};
pub use row::Row;
pub use types::SqlType;
pub use value::Value;
