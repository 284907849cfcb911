//! The default SQL statement builder.
//!
//! `SqlAdapter` implements the core's `Adapter` contract: it renders
//! insert/update/delete statements with positional placeholders for a
//! chosen [`Dialect`] and sanitizes parameters through the declared-type
//! conversion registry. Placeholder numbering always matches the position
//! of the column in the column set handed in, so callers bind parameters
//! in that same order.

use rowbind_core::{Adapter, Plan, Result, SqlType, Statement, Value};

use crate::dialect::{Dialect, quote_ident};

/// Statement builder for SQL backends.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlAdapter {
    dialect: Dialect,
}

impl SqlAdapter {
    /// An adapter for the default dialect (Postgres).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An adapter for a specific dialect.
    #[must_use]
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// The dialect statements are rendered for.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl Adapter for SqlAdapter {
    fn generate_insert_query(&self, table: &str, columns: &[&str]) -> Statement {
        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING *", quote_ident(table))
        } else {
            let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
            let placeholders: Vec<String> = (1..=columns.len())
                .map(|i| self.dialect.placeholder(i))
                .collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
                quote_ident(table),
                column_list.join(", "),
                placeholders.join(", ")
            )
        };
        tracing::debug!(table = table, sql = %sql, "generated insert");
        Statement::new(
            sql,
            Plan::Insert {
                table: table.to_string(),
                columns: columns.iter().map(|c| (*c).to_string()).collect(),
            },
        )
    }

    fn generate_update_query(&self, table: &str, columns: &[&str], key_count: usize) -> Statement {
        let assignments: Vec<String> = columns[key_count..]
            .iter()
            .enumerate()
            .map(|(offset, c)| {
                format!(
                    "{} = {}",
                    quote_ident(c),
                    self.dialect.placeholder(key_count + offset + 1)
                )
            })
            .collect();
        let conditions: Vec<String> = columns[..key_count]
            .iter()
            .enumerate()
            .map(|(offset, c)| {
                format!("{} = {}", quote_ident(c), self.dialect.placeholder(offset + 1))
            })
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} RETURNING *",
            quote_ident(table),
            assignments.join(", "),
            conditions.join(" AND ")
        );
        tracing::debug!(table = table, sql = %sql, "generated update");
        Statement::new(
            sql,
            Plan::Update {
                table: table.to_string(),
                columns: columns.iter().map(|c| (*c).to_string()).collect(),
                key_count,
            },
        )
    }

    fn generate_delete_query(&self, table: &str, columns: &[&str]) -> Statement {
        let conditions: Vec<String> = columns
            .iter()
            .enumerate()
            .map(|(offset, c)| {
                format!("{} = {}", quote_ident(c), self.dialect.placeholder(offset + 1))
            })
            .collect();
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            quote_ident(table),
            conditions.join(" AND ")
        );
        tracing::debug!(table = table, sql = %sql, "generated delete");
        Statement::new(
            sql,
            Plan::Delete {
                table: table.to_string(),
                columns: columns.iter().map(|c| (*c).to_string()).collect(),
            },
        )
    }

    fn sanitize(&self, sql_type: SqlType, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Array(items) => {
                let mut sanitized = Vec::with_capacity(items.len());
                for item in items {
                    sanitized.push(self.sanitize(sql_type, item)?);
                }
                Ok(Value::Array(sanitized))
            }
            other => sql_type.convert(other.clone()),
        }
    }
}
