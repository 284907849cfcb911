//! Rowbind: schema-bound records with dirty tracking and minimal-write
//! persistence.
//!
//! A [`Record`] binds an immutable [`Schema`] to one in-memory row, tracks
//! which fields changed since the last clean checkpoint, validates field
//! and whole-record invariants, and persists itself with the smallest
//! possible write: inserts carry only non-null non-key columns, updates
//! carry only the key plus what actually changed.
//!
//! This facade re-exports the public surface of the workspace crates:
//!
//! - `rowbind-core`: the record abstraction and the `Connection`/`Adapter`
//!   contracts.
//! - `rowbind-query`: SQL statement generation per dialect.
//!
//! The `rowbind-memory` backend is a separate crate, useful for tests and
//! demos.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rowbind::prelude::*;
//!
//! let schema = Schema::new(
//!     "heroes",
//!     vec![
//!         FieldDef::new("id", SqlType::Integer).primary_key().auto_increment(),
//!         FieldDef::new("name", SqlType::Text),
//!     ],
//! )
//! .unwrap();
//! let ty = Arc::new(
//!     RecordType::builder(schema)
//!         .validates("name", "name is required", |v| !v.is_null())
//!         .build()
//!         .unwrap(),
//! );
//!
//! let mut hero = Record::new(ty);
//! hero.set("name", "Deadpond").unwrap();
//! assert!(hero.error_object().is_none());
//! assert_eq!(hero.changed_fields(), vec!["name"]);
//! ```

pub use rowbind_core::{
    Adapter, ChangeSet, Connection, ConversionError, Cx, Error, FieldDef, Outcome, Plan,
    QUERY_ERROR_KEY, QueryError, QueryResult, Record, RecordType, RecordTypeBuilder, Result, Row,
    Schema, SqlType, Statement, ValidationError, ValuesView, Value, WHOLE_RECORD_KEY,
};

pub use rowbind_core::validate;

pub use rowbind_query::{Dialect, SqlAdapter, quote_ident};

/// Everything most applications need, in one import.
pub mod prelude {
    pub use rowbind_core::{
        Adapter, Connection, Cx, Error, FieldDef, Outcome, QUERY_ERROR_KEY, QueryResult, Record,
        RecordType, Result, Row, Schema, SqlType, Statement, ValidationError, Value,
        WHOLE_RECORD_KEY,
    };
    pub use rowbind_query::{Dialect, SqlAdapter};
}
