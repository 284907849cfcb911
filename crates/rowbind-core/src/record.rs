//! Schema-bound records: state tracking, validation, and persistence.
//!
//! A [`RecordType`] is the immutable configuration of one record kind:
//! schema, validation rules, and the external-interface allow-list. It is
//! built once, wrapped in an `Arc`, and shared by every [`Record`]
//! instance of that kind.
//!
//! A [`Record`] is one mutable row-in-memory. It tracks the current value
//! and dirty flag of every schema field, accumulates validation errors,
//! and drives the insert/update/delete lifecycle against any
//! [`Connection`] backend:
//!
//! ```text
//! unsaved --set/load--> dirty --save--> persisted --destroy--> unsaved
//! ```
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rowbind_core::{FieldDef, Record, RecordType, Schema, SqlType, Value};
//!
//! let schema = Schema::new(
//!     "users",
//!     vec![
//!         FieldDef::new("id", SqlType::Integer).primary_key().auto_increment(),
//!         FieldDef::new("name", SqlType::Text),
//!         FieldDef::new("created_at", SqlType::Timestamp),
//!     ],
//! )
//! .unwrap();
//!
//! let ty = Arc::new(
//!     RecordType::builder(schema)
//!         .validates("name", "name is required", |v| !v.is_null())
//!         .build()
//!         .unwrap(),
//! );
//!
//! let mut user = Record::new(Arc::clone(&ty));
//! assert!(user.has_errors());
//! user.set("name", "Alice").unwrap();
//! assert!(!user.has_errors());
//! assert!(user.has_changed_field("name"));
//! assert_eq!(user.get("name"), Some(&Value::Text("Alice".to_string())));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use asupersync::{Cx, Outcome};

use crate::changes::ChangeSet;
use crate::connection::{Adapter, Connection};
use crate::error::{Error, Result, ValidationError};
use crate::field::{FieldDef, Schema};
use crate::row::Row;
use crate::value::Value;

/// Error key holding whole-record (cross-field) validation failures.
pub const WHOLE_RECORD_KEY: &str = "*";

/// Reserved error key for storage-execution failures.
pub const QUERY_ERROR_KEY: &str = "_query";

/// Message reported when destroying a record that was never persisted.
const NOT_SAVED_MESSAGE: &str = "Model has not been saved";

type FieldPredicate = Box<dyn Fn(&Value) -> bool + Send + Sync>;
type RecordPredicate = Box<dyn Fn(&ValuesView<'_>) -> bool + Send + Sync>;

struct FieldRule {
    message: String,
    check: FieldPredicate,
}

struct RecordRule {
    message: String,
    check: RecordPredicate,
}

/// A read-only view over a record's full value mapping, handed to
/// whole-record validation rules.
pub struct ValuesView<'a> {
    schema: &'a Schema,
    values: &'a [Value],
}

impl ValuesView<'_> {
    /// Look up a field's current value. `None` only for unknown fields.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.schema.field_index(field).map(|idx| &self.values[idx])
    }

    /// Iterate `(field, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .zip(self.values.iter())
    }
}

// ============================================================================
// RecordType
// ============================================================================

/// The immutable configuration shared by all records of one kind.
///
/// Holds the schema, the registered validation rules, and the allow-list
/// used by [`Record::to_std_object`]. Never mutated after `build()`;
/// share it across instances (and threads) behind an `Arc`.
pub struct RecordType {
    schema: Schema,
    field_rules: Vec<Vec<FieldRule>>,
    record_rules: Vec<RecordRule>,
    external_interface: Vec<String>,
}

impl RecordType {
    /// Start building a record type over `schema`.
    #[must_use]
    pub fn builder(schema: Schema) -> RecordTypeBuilder {
        RecordTypeBuilder {
            schema,
            field_rules: Vec::new(),
            record_rules: Vec::new(),
            external_interface: vec!["id".to_string(), "created_at".to_string()],
        }
    }

    /// The bound schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Field names exposed by [`Record::to_std_object`].
    #[must_use]
    pub fn external_interface(&self) -> &[String] {
        &self.external_interface
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("table", &self.schema.table())
            .field("fields", &self.schema.len())
            .finish()
    }
}

/// Builder for [`RecordType`].
pub struct RecordTypeBuilder {
    schema: Schema,
    field_rules: Vec<(String, FieldRule)>,
    record_rules: Vec<RecordRule>,
    external_interface: Vec<String>,
}

impl RecordTypeBuilder {
    /// Register a field-level validation rule.
    ///
    /// `check` receives the field's current value and returns true when
    /// valid. Multiple rules may target the same field; all of them run.
    #[must_use]
    pub fn validates(
        mut self,
        field: impl Into<String>,
        message: impl Into<String>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.field_rules.push((
            field.into(),
            FieldRule {
                message: message.into(),
                check: Box::new(check),
            },
        ));
        self
    }

    /// Register a whole-record rule, reported under the `"*"` key.
    #[must_use]
    pub fn validates_record(
        mut self,
        message: impl Into<String>,
        check: impl Fn(&ValuesView<'_>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.record_rules.push(RecordRule {
            message: message.into(),
            check: Box::new(check),
        });
        self
    }

    /// Replace the external-interface allow-list (default `id`,
    /// `created_at`).
    #[must_use]
    pub fn external_interface<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.external_interface = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve rules against the schema and freeze the type.
    ///
    /// A rule registered for a field the schema does not declare is a
    /// programmer error ([`Error::UnknownField`]).
    pub fn build(self) -> Result<RecordType> {
        let mut field_rules: Vec<Vec<FieldRule>> = Vec::new();
        field_rules.resize_with(self.schema.len(), Vec::new);

        for (field, rule) in self.field_rules {
            let Some(idx) = self.schema.field_index(&field) else {
                return Err(Error::unknown_field(self.schema.table(), field));
            };
            field_rules[idx].push(rule);
        }

        Ok(RecordType {
            schema: self.schema,
            field_rules,
            record_rules: self.record_rules,
            external_interface: self.external_interface,
        })
    }
}

// ============================================================================
// Record
// ============================================================================

/// One schema-bound entity instance: a potential or actual storage row.
pub struct Record {
    ty: Arc<RecordType>,
    values: Vec<Value>,
    dirty: ChangeSet,
    errors: BTreeMap<String, Vec<String>>,
    persisted: bool,
}

impl Record {
    /// Construct an empty record: every field null and clean.
    ///
    /// Validation runs immediately, so rules over required fields surface
    /// before any data is loaded.
    #[must_use]
    pub fn new(ty: Arc<RecordType>) -> Self {
        let len = ty.schema().len();
        let mut record = Self {
            ty,
            values: vec![Value::Null; len],
            dirty: ChangeSet::empty(len),
            errors: BTreeMap::new(),
            persisted: false,
        };
        record.revalidate();
        record
    }

    /// Construct a record seeded from `data`.
    ///
    /// `from_storage = true` hydrates without validation or dirty-marking
    /// and marks the record persisted; `false` treats `data` as user input.
    pub fn from_data(ty: Arc<RecordType>, data: &Row, from_storage: bool) -> Result<Self> {
        let mut record = Self::new(ty);
        record.load(data, from_storage)?;
        Ok(record)
    }

    /// The shared record-type configuration.
    #[must_use]
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.ty
    }

    /// The bound schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        self.ty.schema()
    }

    /// The storage table name.
    #[must_use]
    pub fn table_name(&self) -> &str {
        self.ty.schema().table()
    }

    /// Field names in schema order.
    #[must_use]
    pub fn field_list(&self) -> Vec<&str> {
        self.ty.schema().field_list()
    }

    /// Field definitions in schema order.
    #[must_use]
    pub fn field_definitions(&self) -> &[FieldDef] {
        self.ty.schema().columns()
    }

    /// True once this instance corresponds to a stored row.
    #[must_use]
    pub fn in_storage(&self) -> bool {
        self.persisted
    }

    /// A read-only view over the full value mapping.
    #[must_use]
    pub fn values_view(&self) -> ValuesView<'_> {
        ValuesView {
            schema: self.ty.schema(),
            values: &self.values,
        }
    }

    // ========================================================================
    // State tracker
    // ========================================================================

    /// A field's current value. `None` only for an unknown field; unset
    /// fields read as `Value::Null`. No validation side effect.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.ty
            .schema()
            .field_index(field)
            .map(|idx| &self.values[idx])
    }

    /// Set a field from raw input, validating and logging the change.
    ///
    /// Shorthand for `set_with(field, value, true, true)`.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        self.set_with(field, value, true, true)
    }

    /// Set a field with explicit control over validation and change
    /// logging.
    ///
    /// The input is converted through the field's declared type (scalars
    /// directly; array fields wrap scalar input and convert element-wise).
    /// The stored value is replaced only if it actually differs - arrays
    /// compare element-wise, with a length difference counting as a
    /// change. The field's dirty flag is then *assigned* the outcome of
    /// this call (`changed && log_change`), so re-setting a field to its
    /// stored value clears dirtiness.
    ///
    /// Validation (field rules plus whole-record rules, restricted to this
    /// field) runs when `validate` is true and either logging is disabled
    /// or the value actually changed.
    pub fn set_with(
        &mut self,
        field: &str,
        value: impl Into<Value>,
        validate: bool,
        log_change: bool,
    ) -> Result<()> {
        let Some(idx) = self.ty.schema().field_index(field) else {
            return Err(Error::unknown_field(self.ty.schema().table(), field));
        };
        let def = &self.ty.schema().columns()[idx];
        let (sql_type, is_array) = (def.sql_type, def.array);

        let raw = value.into();
        let new_value = if raw.is_null() {
            Value::Null
        } else if is_array {
            let elements = match raw {
                Value::Array(items) => items,
                scalar => vec![scalar],
            };
            let mut converted = Vec::with_capacity(elements.len());
            for element in elements {
                if element.is_null() {
                    converted.push(Value::Null);
                } else {
                    converted.push(sql_type.convert(element)?);
                }
            }
            Value::Array(converted)
        } else {
            sql_type.convert(raw)?
        };

        let value_changed = match (&new_value, &self.values[idx]) {
            (Value::Array(new), Value::Array(cur)) => {
                new.len() != cur.len() || new.iter().zip(cur.iter()).any(|(n, c)| n != c)
            }
            (new, cur) => new != cur,
        };
        if value_changed {
            self.values[idx] = new_value;
        }

        self.dirty.assign(idx, value_changed && log_change);

        if validate && (!log_change || value_changed) {
            self.validate_fields(Some(&[idx]));
        }

        Ok(())
    }

    /// Ingest a row of raw data, field by field.
    ///
    /// The single ingestion path for both user input and storage rows,
    /// distinguished by `from_storage`:
    ///
    /// - `false`: a `created_at` timestamp is stamped first (when the
    ///   schema declares the field), and every supplied field is validated
    ///   and change-logged.
    /// - `true`: validation and change logging are suppressed (the data is
    ///   already valid and already persisted) and the record is marked as
    ///   being in storage.
    ///
    /// Only keys the schema declares are consumed; extra columns in `data`
    /// are ignored.
    pub fn load(&mut self, data: &Row, from_storage: bool) -> Result<()> {
        self.persisted = from_storage;

        if !from_storage && self.ty.schema().has_field("created_at") {
            self.set_with("created_at", Value::timestamp_now(), true, true)?;
        }

        let ty = Arc::clone(&self.ty);
        for column in ty.schema().columns() {
            if let Some(value) = data.get(&column.name) {
                self.set_with(&column.name, value.clone(), !from_storage, !from_storage)?;
            }
        }
        Ok(())
    }

    /// True if any field is dirty.
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.dirty.any()
    }

    /// A single field's dirty flag. Unknown fields are never dirty.
    #[must_use]
    pub fn has_changed_field(&self, field: &str) -> bool {
        self.ty
            .schema()
            .field_index(field)
            .is_some_and(|idx| self.dirty.is_set(idx))
    }

    /// Dirty field names, in schema order.
    #[must_use]
    pub fn changed_fields(&self) -> Vec<&str> {
        self.dirty
            .iter_set()
            .map(|idx| self.ty.schema().columns()[idx].name.as_str())
            .collect()
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Re-run validation over every field.
    pub fn revalidate(&mut self) {
        self.validate_fields(None);
    }

    /// Re-run validation over a subset of fields (or all when `None`).
    ///
    /// Errors are a derived cache: each covered key is cleared before its
    /// rules run, and the `"*"` key is cleared once per pass. The
    /// `"_query"` key is never touched here.
    fn validate_fields(&mut self, fields: Option<&[usize]>) {
        self.errors.remove(WHOLE_RECORD_KEY);

        let ty = Arc::clone(&self.ty);
        let all: Vec<usize>;
        let indices = match fields {
            Some(list) => list,
            None => {
                all = (0..ty.schema().len()).collect();
                &all
            }
        };

        for &idx in indices {
            let name = ty.schema().columns()[idx].name.as_str();
            self.errors.remove(name);
            for rule in &ty.field_rules[idx] {
                if !(rule.check)(&self.values[idx]) {
                    self.errors
                        .entry(name.to_string())
                        .or_default()
                        .push(rule.message.clone());
                }
            }
        }

        let view = ValuesView {
            schema: ty.schema(),
            values: &self.values,
        };
        for rule in &ty.record_rules {
            if !(rule.check)(&view) {
                self.errors
                    .entry(WHOLE_RECORD_KEY.to_string())
                    .or_default()
                    .push(rule.message.clone());
            }
        }
    }

    /// True if any key (including `"*"` and `"_query"`) holds errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// A defensive snapshot of the error map.
    #[must_use]
    pub fn get_errors(&self) -> BTreeMap<String, Vec<String>> {
        self.errors.clone()
    }

    /// The error snapshot, or `None` when nothing is wrong.
    #[must_use]
    pub fn error_object(&self) -> Option<ValidationError> {
        if self.has_errors() {
            Some(self.validation_snapshot())
        } else {
            None
        }
    }

    fn validation_snapshot(&self) -> ValidationError {
        ValidationError {
            errors: self.errors.clone(),
        }
    }

    fn set_error(&mut self, key: &str, message: String) {
        self.errors.entry(key.to_string()).or_default().push(message);
    }

    // ========================================================================
    // Projections
    // ========================================================================

    /// Snapshot of every field, in schema order.
    #[must_use]
    pub fn to_object(&self) -> Row {
        self.ty
            .schema()
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, c)| (c.name.clone(), self.values[idx].clone()))
            .collect()
    }

    /// Snapshot restricted to the external-interface allow-list, in
    /// allow-list order. Allow-listed names the schema does not declare
    /// are skipped.
    #[must_use]
    pub fn to_std_object(&self) -> Row {
        self.ty
            .external_interface()
            .iter()
            .filter_map(|name| {
                self.get(name).map(|value| (name.clone(), value.clone()))
            })
            .collect()
    }

    /// JSON projection of the full field snapshot.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (idx, column) in self.ty.schema().columns().iter().enumerate() {
            map.insert(column.name.clone(), self.values[idx].to_json());
        }
        serde_json::Value::Object(map)
    }

    // ========================================================================
    // Persistence driver
    // ========================================================================

    /// Persist the record: insert when unpersisted, otherwise update
    /// exactly the dirty non-key columns.
    ///
    /// Outstanding validation errors short-circuit before any I/O and
    /// complete with [`Error::Validation`]. A storage failure is recorded
    /// under the `"_query"` key and completes the same way, leaving the
    /// persistence state unchanged. On success the returned row (if any)
    /// re-hydrates the record, which clears the reloaded dirty flags and
    /// is the only place the persisted flag flips to true.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn save<C: Connection>(&mut self, cx: &Cx, conn: &C) -> Outcome<(), Error> {
        if self.has_errors() {
            tracing::debug!(
                table = self.table_name(),
                "save skipped: record has outstanding errors"
            );
            return Outcome::Err(Error::Validation(self.validation_snapshot()));
        }

        let ty = Arc::clone(&self.ty);
        let schema = ty.schema();

        let (statement, cols) = if self.persisted {
            let mut cols: Vec<usize> = schema
                .columns()
                .iter()
                .enumerate()
                .filter(|(_, c)| c.primary_key)
                .map(|(idx, _)| idx)
                .collect();
            let key_count = cols.len();

            let changed: Vec<usize> = self
                .dirty
                .iter_set()
                .filter(|&idx| !schema.columns()[idx].primary_key)
                .collect();
            if changed.is_empty() {
                tracing::debug!(table = schema.table(), "save skipped: no columns changed");
                return Outcome::Ok(());
            }
            cols.extend(changed);

            let names: Vec<&str> = cols
                .iter()
                .map(|&idx| schema.columns()[idx].name.as_str())
                .collect();
            tracing::debug!(table = schema.table(), columns = ?names, "updating record");
            (
                conn.adapter()
                    .generate_update_query(schema.table(), &names, key_count),
                cols,
            )
        } else {
            let cols: Vec<usize> = schema
                .columns()
                .iter()
                .enumerate()
                .filter(|&(idx, c)| !c.primary_key && !self.values[idx].is_null())
                .map(|(idx, _)| idx)
                .collect();
            let names: Vec<&str> = cols
                .iter()
                .map(|&idx| schema.columns()[idx].name.as_str())
                .collect();
            tracing::debug!(table = schema.table(), columns = ?names, "inserting record");
            (
                conn.adapter().generate_insert_query(schema.table(), &names),
                cols,
            )
        };

        let params = match self.sanitized_params(conn.adapter(), &cols) {
            Ok(params) => params,
            Err(e) => return Outcome::Err(e),
        };

        match conn.query(cx, &statement, &params).await {
            Outcome::Ok(result) => {
                if let Some(row) = result.rows.first() {
                    let row = row.clone();
                    if let Err(e) = self.load(&row, true) {
                        return Outcome::Err(e);
                    }
                }
                Outcome::Ok(())
            }
            Outcome::Err(e) => {
                tracing::warn!(table = self.table_name(), error = %e, "save failed");
                self.set_error(QUERY_ERROR_KEY, e.to_string());
                Outcome::Err(Error::Validation(self.validation_snapshot()))
            }
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Delete the stored row this record corresponds to.
    ///
    /// A record that was never persisted completes with the reserved
    /// `"_query"` error and performs no I/O. On success the record
    /// transitions back to unpersisted; its field values are untouched.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn destroy<C: Connection>(&mut self, cx: &Cx, conn: &C) -> Outcome<(), Error> {
        if !self.persisted {
            tracing::debug!(
                table = self.table_name(),
                "destroy skipped: record not in storage"
            );
            return Outcome::Err(Error::Validation(ValidationError::single(
                QUERY_ERROR_KEY,
                NOT_SAVED_MESSAGE,
            )));
        }

        let ty = Arc::clone(&self.ty);
        let schema = ty.schema();
        let cols: Vec<usize> = schema
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| c.primary_key)
            .map(|(idx, _)| idx)
            .collect();
        let names: Vec<&str> = cols
            .iter()
            .map(|&idx| schema.columns()[idx].name.as_str())
            .collect();
        tracing::debug!(table = schema.table(), keys = ?names, "destroying record");

        let statement = conn.adapter().generate_delete_query(schema.table(), &names);
        let params = match self.sanitized_params(conn.adapter(), &cols) {
            Ok(params) => params,
            Err(e) => return Outcome::Err(e),
        };

        match conn.query(cx, &statement, &params).await {
            Outcome::Ok(_) => {
                self.persisted = false;
                Outcome::Ok(())
            }
            Outcome::Err(e) => {
                tracing::warn!(table = self.table_name(), error = %e, "destroy failed");
                self.set_error(QUERY_ERROR_KEY, e.to_string());
                Outcome::Err(Error::Validation(self.validation_snapshot()))
            }
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    fn sanitized_params(&self, adapter: &dyn Adapter, cols: &[usize]) -> Result<Vec<Value>> {
        let schema = self.ty.schema();
        let mut params = Vec::with_capacity(cols.len());
        for &idx in cols {
            let column = &schema.columns()[idx];
            params.push(adapter.sanitize(column.sql_type, &self.values[idx])?);
        }
        Ok(params)
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.table_name())
            .field("persisted", &self.persisted)
            .field("changed", &self.changed_fields())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SqlType;
    use crate::validate;

    fn users_type() -> Arc<RecordType> {
        let schema = Schema::new(
            "users",
            vec![
                FieldDef::new("id", SqlType::Integer)
                    .primary_key()
                    .auto_increment(),
                FieldDef::new("name", SqlType::Text),
                FieldDef::new("age", SqlType::Integer),
                FieldDef::new("tags", SqlType::Integer).array(),
                FieldDef::new("created_at", SqlType::Timestamp),
            ],
        )
        .unwrap();
        Arc::new(RecordType::builder(schema).build().unwrap())
    }

    fn validated_type() -> Arc<RecordType> {
        let schema = Schema::new(
            "users",
            vec![
                FieldDef::new("id", SqlType::Integer).primary_key(),
                FieldDef::new("name", SqlType::Text),
                FieldDef::new("age", SqlType::Integer),
            ],
        )
        .unwrap();
        Arc::new(
            RecordType::builder(schema)
                .validates("name", "name is required", validate::present())
                .validates_record("age must accompany name", |view| {
                    view.get("name").is_some_and(Value::is_null)
                        || view.get("age").is_some_and(|v| !v.is_null())
                })
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_fresh_record_is_null_and_clean() {
        let record = Record::new(users_type());
        assert_eq!(
            record.field_list(),
            vec!["id", "name", "age", "tags", "created_at"]
        );
        for field in record.field_list() {
            assert_eq!(record.get(field), Some(&Value::Null));
        }
        assert!(!record.has_changed());
        assert!(record.changed_fields().is_empty());
        assert!(!record.in_storage());
    }

    #[test]
    fn test_set_unknown_field_is_fatal() {
        let mut record = Record::new(users_type());
        let err = record.set("nickname", "x").unwrap_err();
        assert_eq!(err, Error::unknown_field("users", "nickname"));
    }

    #[test]
    fn test_set_converts_through_declared_type() {
        let mut record = Record::new(users_type());
        record.set("age", "42").unwrap();
        assert_eq!(record.get("age"), Some(&Value::Int(42)));
        assert!(record.set("age", "not a number").is_err());
        // failed conversion leaves the stored value untouched
        assert_eq!(record.get("age"), Some(&Value::Int(42)));
    }

    #[test]
    fn test_set_is_idempotent_for_dirtiness() {
        let mut record = Record::new(users_type());
        record.set("name", "Alice").unwrap();
        assert!(record.has_changed_field("name"));

        record.set("name", "Alice").unwrap();
        assert!(!record.has_changed_field("name"));
        assert_eq!(record.get("name"), Some(&Value::Text("Alice".to_string())));
    }

    #[test]
    fn test_array_field_wraps_and_compares_elementwise() {
        let mut record = Record::new(users_type());
        record.set("tags", 7).unwrap();
        assert_eq!(record.get("tags"), Some(&Value::Array(vec![Value::Int(7)])));

        record
            .set("tags", vec![Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        assert!(record.has_changed_field("tags"));

        record
            .set("tags", vec![Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap();
        assert!(!record.has_changed_field("tags"));

        record
            .set("tags", vec![Value::Int(1), Value::Int(2), Value::Int(4)])
            .unwrap();
        assert!(record.has_changed_field("tags"));

        // a shorter sequence with an equal prefix still counts as a change
        record.set("tags", vec![Value::Int(1), Value::Int(2)]).unwrap();
        assert!(record.has_changed_field("tags"));
        assert_eq!(
            record.get("tags"),
            Some(&Value::Array(vec![Value::Int(1), Value::Int(2)]))
        );
    }

    #[test]
    fn test_array_elements_are_converted() {
        let mut record = Record::new(users_type());
        record
            .set("tags", vec![Value::Text("5".to_string()), Value::Null])
            .unwrap();
        assert_eq!(
            record.get("tags"),
            Some(&Value::Array(vec![Value::Int(5), Value::Null]))
        );
    }

    // The four {validate, log_change} x {changed, unchanged} combinations.

    #[test]
    fn test_set_with_validate_logged_changed_runs_validation() {
        let mut record = Record::new(validated_type());
        record.set_with("name", Value::Null, true, true).unwrap();
        // unchanged (still null): validation must NOT re-run; errors stay
        // from construction
        assert!(record.has_errors());

        record.set_with("name", "Ada", true, true).unwrap();
        assert!(record.get_errors().get("name").is_none());
        assert!(record.has_changed_field("name"));
    }

    #[test]
    fn test_set_with_validate_logged_unchanged_skips_validation() {
        let mut record = Record::new(validated_type());
        record.set_with("name", "Ada", true, true).unwrap();
        record.set_with("age", 30, true, true).unwrap();
        assert!(!record.has_errors());

        // force an error state by hand, then re-set the same value: the
        // branch must not clear it because validation is skipped
        record.set_error("name", "stale".to_string());
        record.set_with("name", "Ada", true, true).unwrap();
        assert_eq!(record.get_errors().get("name").unwrap(), &vec!["stale".to_string()]);
        assert!(!record.has_changed_field("name"));
    }

    #[test]
    fn test_set_with_validate_unlogged_runs_validation_even_unchanged() {
        let mut record = Record::new(validated_type());
        record.set_with("name", "Ada", true, true).unwrap();
        record.set_with("age", 30, true, true).unwrap();

        record.set_error("name", "stale".to_string());
        record.set_with("name", "Ada", true, false).unwrap();
        // !log_change forces revalidation, clearing the stale error
        assert!(record.get_errors().get("name").is_none());
        assert!(!record.has_changed_field("name"));
    }

    #[test]
    fn test_set_with_no_validate_never_validates() {
        let mut record = Record::new(validated_type());
        assert!(record.has_errors());

        record.set_with("name", "Ada", false, true).unwrap();
        record.set_with("age", 30, false, true).unwrap();
        // values changed but validation never ran; construction errors stay
        assert!(record.has_errors());
        assert!(record.has_changed_field("name"));

        record.revalidate();
        assert!(!record.has_errors());
    }

    #[test]
    fn test_log_change_false_clears_prior_dirtiness() {
        let mut record = Record::new(users_type());
        record.set("name", "Alice").unwrap();
        assert!(record.has_changed_field("name"));

        record.set_with("name", "Bob", true, false).unwrap();
        assert!(!record.has_changed_field("name"));
        assert_eq!(record.get("name"), Some(&Value::Text("Bob".to_string())));
    }

    #[test]
    fn test_load_user_data_marks_dirty_and_stamps_created_at() {
        let mut record = Record::new(users_type());
        let data = Row::from_pairs([
            ("name".to_string(), Value::Text("Alice".to_string())),
            ("age".to_string(), Value::Int(30)),
        ]);
        record.load(&data, false).unwrap();

        assert!(record.has_changed_field("name"));
        assert!(record.has_changed_field("age"));
        assert!(record.has_changed_field("created_at"));
        assert!(record.get("created_at").unwrap().as_timestamp().is_some());
        assert!(!record.in_storage());
    }

    #[test]
    fn test_load_user_data_runs_validation() {
        let mut record = Record::new(validated_type());
        assert!(record.has_errors());

        let data = Row::from_pairs([
            ("name".to_string(), Value::Text("Ada".to_string())),
            ("age".to_string(), Value::Int(30)),
        ]);
        record.load(&data, false).unwrap();
        // the supplied fields were validated as they loaded, clearing the
        // construction-time errors
        assert!(!record.has_errors());
    }

    #[test]
    fn test_load_from_storage_marks_clean_and_persisted() {
        let ty = validated_type();
        let data = Row::from_pairs([
            ("id".to_string(), Value::Int(1)),
            // would fail the "name is required" rule if validation ran
            ("name".to_string(), Value::Null),
        ]);
        let record = Record::from_data(ty, &data, true).unwrap();

        assert!(record.in_storage());
        assert!(!record.has_changed());
        // construction errors are untouched by the storage load, but the
        // hydrated null was not re-validated
        assert!(record.has_errors());
    }

    #[test]
    fn test_load_ignores_extra_columns() {
        let mut record = Record::new(users_type());
        let data = Row::from_pairs([
            ("name".to_string(), Value::Text("Alice".to_string())),
            ("unknown_column".to_string(), Value::Int(1)),
        ]);
        record.load(&data, true).unwrap();
        assert_eq!(record.get("name"), Some(&Value::Text("Alice".to_string())));
    }

    #[test]
    fn test_round_trip_to_object() {
        let ty = users_type();
        let data = Row::from_pairs([
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::Text("Alice".to_string())),
            ("age".to_string(), Value::Int(30)),
        ]);
        let record = Record::from_data(ty, &data, true).unwrap();
        let snapshot = record.to_object();

        assert_eq!(
            snapshot.columns(),
            &["id", "name", "age", "tags", "created_at"]
        );
        assert_eq!(snapshot.get("id"), Some(&Value::Int(1)));
        assert_eq!(snapshot.get("name"), Some(&Value::Text("Alice".to_string())));
        assert_eq!(snapshot.get("tags"), Some(&Value::Null));
    }

    #[test]
    fn test_to_std_object_uses_allow_list() {
        let ty = users_type();
        let data = Row::from_pairs([
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::Text("Alice".to_string())),
        ]);
        let record = Record::from_data(ty, &data, true).unwrap();
        let std_object = record.to_std_object();

        assert_eq!(std_object.columns(), &["id", "created_at"]);
        assert_eq!(std_object.get("id"), Some(&Value::Int(1)));
        assert!(std_object.get("name").is_none());
    }

    #[test]
    fn test_to_json_projection() {
        let ty = users_type();
        let data = Row::from_pairs([
            ("id".to_string(), Value::Int(1)),
            ("name".to_string(), Value::Text("Alice".to_string())),
        ]);
        let record = Record::from_data(ty, &data, true).unwrap();
        let json = record.to_json();

        assert_eq!(json["id"], serde_json::json!(1));
        assert_eq!(json["name"], serde_json::json!("Alice"));
        assert_eq!(json["age"], serde_json::Value::Null);
    }

    #[test]
    fn test_whole_record_rules_report_under_star() {
        let mut record = Record::new(validated_type());
        record.set("name", "Ada").unwrap();
        // name present but age missing violates the record rule
        let errors = record.get_errors();
        assert_eq!(
            errors.get(WHOLE_RECORD_KEY).unwrap(),
            &vec!["age must accompany name".to_string()]
        );

        record.set("age", 30).unwrap();
        assert!(!record.has_errors());
    }

    #[test]
    fn test_error_object_sentinel() {
        let mut record = Record::new(validated_type());
        assert!(record.error_object().is_some());
        record.set("name", "Ada").unwrap();
        record.set("age", 30).unwrap();
        assert!(record.error_object().is_none());
    }

    #[test]
    fn test_builder_rejects_rule_for_unknown_field() {
        let schema = Schema::new("users", vec![FieldDef::new("id", SqlType::Integer)]).unwrap();
        let err = RecordType::builder(schema)
            .validates("nickname", "nope", validate::present())
            .build()
            .unwrap_err();
        assert_eq!(err, Error::unknown_field("users", "nickname"));
    }
}
