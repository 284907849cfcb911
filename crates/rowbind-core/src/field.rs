//! Field definitions and schema binding.
//!
//! A [`Schema`] is the immutable description shared by every record of one
//! type: the table name plus an ordered field list, resolved once into a
//! name lookup. Schemas never change after construction and are safe to
//! share across instances (typically behind an `Arc` inside a
//! `RecordType`).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::SqlType;

/// Metadata about one record field / database column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name, unique within its schema.
    pub name: String,
    /// Declared SQL type.
    pub sql_type: SqlType,
    /// Whether the field holds an ordered sequence of `sql_type` values.
    pub array: bool,
    /// Whether this field is part of the primary key.
    pub primary_key: bool,
    /// Whether this field auto-increments on insert.
    pub auto_increment: bool,
    /// Whether this field is nullable.
    pub nullable: bool,
}

impl FieldDef {
    /// Create a new field definition.
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        Self {
            name: name.into(),
            sql_type,
            array: false,
            primary_key: false,
            auto_increment: false,
            nullable: true,
        }
    }

    /// Mark as array-typed.
    #[must_use]
    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    /// Mark as primary key.
    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as auto-incrementing.
    #[must_use]
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Mark as NOT NULL.
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// An immutable table schema: name plus ordered field definitions.
#[derive(Debug, Clone)]
pub struct Schema {
    table: String,
    columns: Vec<FieldDef>,
    lookup: HashMap<String, usize>,
}

impl Schema {
    /// Bind a table name and field list into a schema.
    ///
    /// Field names must be unique; a duplicate is a programmer error
    /// reported as [`Error::DuplicateField`].
    pub fn new(table: impl Into<String>, columns: Vec<FieldDef>) -> Result<Self> {
        let table = table.into();
        let mut lookup = HashMap::with_capacity(columns.len());
        for (idx, column) in columns.iter().enumerate() {
            if lookup.insert(column.name.clone(), idx).is_some() {
                return Err(Error::duplicate_field(table, column.name.clone()));
            }
        }
        Ok(Self {
            table,
            columns,
            lookup,
        })
    }

    /// The storage table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Field definitions in declaration order.
    #[must_use]
    pub fn columns(&self) -> &[FieldDef] {
        &self.columns
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True for a schema with no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Field names in declaration order.
    #[must_use]
    pub fn field_list(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// True if the schema declares the field.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Position of a field in declaration order.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// The definition of a field, or [`Error::UnknownField`].
    pub fn field_definition(&self, name: &str) -> Result<&FieldDef> {
        self.field_index(name)
            .map(|idx| &self.columns[idx])
            .ok_or_else(|| Error::unknown_field(&self.table, name))
    }

    /// True if the named field is array-typed. Unknown fields are not.
    #[must_use]
    pub fn is_array_field(&self, name: &str) -> bool {
        self.field_index(name).is_some_and(|idx| self.columns[idx].array)
    }

    /// True if the named field is part of the primary key.
    #[must_use]
    pub fn is_primary_key_field(&self, name: &str) -> bool {
        self.field_index(name)
            .is_some_and(|idx| self.columns[idx].primary_key)
    }

    /// Primary-key field names in declaration order.
    #[must_use]
    pub fn primary_key_fields(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}
