//! Declared column types and the value conversion registry.
//!
//! Every field carries a [`SqlType`]; [`SqlType::convert`] is the single
//! coercion point through which all raw input passes before it is stored on
//! a record or bound as a statement parameter. Unconvertible input is a
//! fatal [`Error::Conversion`], not a validation failure.

use serde::{Deserialize, Serialize};

use crate::error::{ConversionError, Error, Result};
use crate::value::Value;

/// SQL data types supported by the record core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlType {
    /// BOOLEAN
    Boolean,
    /// BIGINT
    Integer,
    /// DOUBLE PRECISION
    Float,
    /// TEXT
    Text,
    /// TIMESTAMP, carried as epoch milliseconds
    Timestamp,
}

impl SqlType {
    /// The SQL name of this type.
    #[must_use]
    pub const fn sql_name(&self) -> &'static str {
        match self {
            SqlType::Boolean => "BOOLEAN",
            SqlType::Integer => "BIGINT",
            SqlType::Float => "DOUBLE PRECISION",
            SqlType::Text => "TEXT",
            SqlType::Timestamp => "TIMESTAMP",
        }
    }

    /// Coerce a raw value into this type's canonical [`Value`] variant.
    ///
    /// `Null` is not handled here: callers skip conversion for null input.
    /// Array input is rejected; array-typed fields convert element-wise
    /// through the state tracker before reaching this function.
    pub fn convert(self, value: Value) -> Result<Value> {
        let rejected = |value: &Value| {
            Error::Conversion(ConversionError {
                sql_type: self,
                value: format!("{value:?}"),
            })
        };

        match self {
            SqlType::Boolean => match value {
                Value::Bool(b) => Ok(Value::Bool(b)),
                Value::Int(i) => Ok(Value::Bool(i != 0)),
                Value::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                    "true" | "t" | "1" => Ok(Value::Bool(true)),
                    "false" | "f" | "0" => Ok(Value::Bool(false)),
                    _ => Err(rejected(&Value::Text(s))),
                },
                other => Err(rejected(&other)),
            },
            SqlType::Integer => match value {
                Value::Int(i) => Ok(Value::Int(i)),
                Value::Bool(b) => Ok(Value::Int(i64::from(b))),
                Value::Float(f) if f.is_finite() => Ok(Value::Int(f as i64)),
                Value::Timestamp(ms) => Ok(Value::Int(ms)),
                Value::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| rejected(&Value::Text(s.clone()))),
                other => Err(rejected(&other)),
            },
            SqlType::Float => match value {
                Value::Float(f) => Ok(Value::Float(f)),
                Value::Int(i) => Ok(Value::Float(i as f64)),
                Value::Timestamp(ms) => Ok(Value::Float(ms as f64)),
                Value::Text(s) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| rejected(&Value::Text(s.clone()))),
                other => Err(rejected(&other)),
            },
            SqlType::Text => match value {
                Value::Text(s) => Ok(Value::Text(s)),
                Value::Bool(b) => Ok(Value::Text(b.to_string())),
                Value::Int(i) => Ok(Value::Text(i.to_string())),
                Value::Float(f) => Ok(Value::Text(f.to_string())),
                Value::Timestamp(ms) => Ok(Value::Text(ms.to_string())),
                other => Err(rejected(&other)),
            },
            SqlType::Timestamp => match value {
                Value::Timestamp(ms) => Ok(Value::Timestamp(ms)),
                Value::Int(i) => Ok(Value::Timestamp(i)),
                Value::Float(f) if f.is_finite() => Ok(Value::Timestamp(f as i64)),
                Value::Text(s) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Timestamp)
                    .map_err(|_| rejected(&Value::Text(s.clone()))),
                other => Err(rejected(&other)),
            },
        }
    }
}
