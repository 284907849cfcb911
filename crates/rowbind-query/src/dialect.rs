//! SQL dialect differences relevant to statement generation.

use serde::{Deserialize, Serialize};

/// A SQL dialect the adapter can render statements for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// PostgreSQL: `$1` placeholders.
    #[default]
    Postgres,
    /// SQLite: `?1` placeholders.
    Sqlite,
}

impl Dialect {
    /// The positional parameter placeholder for a 1-based index.
    #[must_use]
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
        }
    }
}

/// Quote an identifier for use in generated SQL.
///
/// Embedded double quotes are doubled per the SQL standard.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
