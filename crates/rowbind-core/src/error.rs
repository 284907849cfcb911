//! Error types shared across the Rowbind crates.
//!
//! Two classes of failure flow through this module:
//!
//! - **Programmer errors** (`UnknownField`, `DuplicateField`, `Conversion`)
//!   are returned eagerly from the synchronous API. They indicate misuse of
//!   a record type, not bad user data, and are never stored on a record.
//! - **Recoverable errors** (`Validation`, `Query`) accumulate on the
//!   record's error map and surface through `error_object()` or the
//!   completion of `save`/`destroy`.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::SqlType;

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for all Rowbind operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// A field name was used that does not belong to the schema.
    UnknownField {
        /// Table the schema is bound to.
        table: String,
        /// The offending field name.
        field: String,
    },
    /// A schema declared the same field name twice.
    DuplicateField {
        /// Table the schema is bound to.
        table: String,
        /// The duplicated field name.
        field: String,
    },
    /// A raw value could not be coerced to a field's declared type.
    Conversion(ConversionError),
    /// The storage collaborator failed to execute a statement.
    Query(QueryError),
    /// One or more validation (or storage) errors accumulated on a record.
    Validation(ValidationError),
}

impl Error {
    /// Build an [`Error::UnknownField`].
    pub fn unknown_field(table: impl Into<String>, field: impl Into<String>) -> Self {
        Error::UnknownField {
            table: table.into(),
            field: field.into(),
        }
    }

    /// Build an [`Error::DuplicateField`].
    pub fn duplicate_field(table: impl Into<String>, field: impl Into<String>) -> Self {
        Error::DuplicateField {
            table: table.into(),
            field: field.into(),
        }
    }

    /// Build an [`Error::Query`] from a message.
    pub fn query(message: impl Into<String>) -> Self {
        Error::Query(QueryError {
            message: message.into(),
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnknownField { table, field } => {
                write!(f, "field {field} does not belong to table {table}")
            }
            Error::DuplicateField { table, field } => {
                write!(f, "field {field} is declared more than once for table {table}")
            }
            Error::Conversion(e) => write!(f, "{e}"),
            Error::Query(e) => write!(f, "{e}"),
            Error::Validation(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for Error {}

/// A raw value could not be coerced to the declared SQL type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    /// The target type of the conversion.
    pub sql_type: SqlType,
    /// Debug rendering of the rejected value.
    pub value: String,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot convert {} to {}",
            self.value,
            self.sql_type.sql_name()
        )
    }
}

/// A statement execution failure reported by the storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    /// Backend-provided failure message.
    pub message: String,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "query failed: {}", self.message)
    }
}

/// A snapshot of a record's accumulated errors.
///
/// Keys are field names, the whole-record key `"*"`, or the reserved
/// `"_query"` key for storage-layer failures. The map is a defensive copy:
/// mutating it never touches the record it came from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationError {
    /// Error messages grouped by field key, in key order.
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    /// Build a snapshot holding a single message under one key.
    pub fn single(key: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = BTreeMap::new();
        errors.insert(key.into(), vec![message.into()]);
        Self { errors }
    }

    /// True if no key holds any message.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Messages recorded under the given key, if any.
    #[must_use]
    pub fn field_errors(&self, key: &str) -> Option<&[String]> {
        self.errors.get(key).map(Vec::as_slice)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed")?;
        for (key, messages) in &self.errors {
            write!(f, "; {key}: {}", messages.join(", "))?;
        }
        Ok(())
    }
}
