//! Capability interfaces for storage collaborators.
//!
//! The record core never talks to a concrete database. It depends on two
//! small traits:
//!
//! - [`Adapter`] turns a table name and column set into an executable
//!   [`Statement`] and sanitizes parameter values by declared type.
//! - [`Connection`] executes statements and hands back rows.
//!
//! Any backend implementing both can persist records; the core contains no
//! dialect or transport knowledge.

use asupersync::{Cx, Outcome};

use crate::error::{Error, Result};
use crate::row::Row;
use crate::types::SqlType;
use crate::value::Value;

/// The structured form of a write statement.
///
/// Backends that speak SQL render [`Statement::sql`]; backends that do not
/// (such as the in-memory store) execute the plan directly. Both describe
/// the same operation over the same positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Plan {
    /// Insert one row; parameters align with `columns`.
    Insert {
        /// Target table.
        table: String,
        /// Columns receiving parameters, in parameter order.
        columns: Vec<String>,
    },
    /// Update rows matched by the first `key_count` columns, assigning the
    /// rest; parameters align with `columns`.
    Update {
        /// Target table.
        table: String,
        /// Key columns followed by assignment columns, in parameter order.
        columns: Vec<String>,
        /// How many leading entries of `columns` are key columns.
        key_count: usize,
    },
    /// Delete rows matched by `columns`; parameters align with `columns`.
    Delete {
        /// Target table.
        table: String,
        /// Key columns, in parameter order.
        columns: Vec<String>,
    },
}

/// An executable write statement produced by an [`Adapter`].
///
/// Opaque to the record core: it is built by the adapter and consumed by
/// the connection, never inspected in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    plan: Plan,
}

impl Statement {
    /// Pair rendered SQL text with its structured plan.
    #[must_use]
    pub fn new(sql: String, plan: Plan) -> Self {
        Self { sql, plan }
    }

    /// The rendered SQL text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The structured plan.
    #[must_use]
    pub fn plan(&self) -> &Plan {
        &self.plan
    }
}

/// Builds statements and sanitizes parameters for one storage dialect.
pub trait Adapter: Send + Sync {
    /// Build an insert over `columns` for `table`, returning the stored row.
    fn generate_insert_query(&self, table: &str, columns: &[&str]) -> Statement;

    /// Build an update of `columns[key_count..]` keyed by
    /// `columns[..key_count]` for `table`, returning the updated row.
    fn generate_update_query(&self, table: &str, columns: &[&str], key_count: usize) -> Statement;

    /// Build a delete keyed by `columns` for `table`.
    fn generate_delete_query(&self, table: &str, columns: &[&str]) -> Statement;

    /// Coerce a parameter to the wire form for its declared type.
    ///
    /// Null passes through; array values sanitize element-wise. An
    /// unconvertible value is a fatal [`Error::Conversion`].
    fn sanitize(&self, sql_type: SqlType, value: &Value) -> Result<Value>;
}

/// The outcome of executing one statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    /// Returned rows, in backend order. Possibly empty.
    pub rows: Vec<Row>,
    /// Number of rows the statement affected.
    pub rows_affected: u64,
}

/// A handle to a storage backend able to execute statements.
///
/// Implementations take `&self`; a backend needing mutation uses interior
/// locking. `query` completes exactly once, through the returned
/// [`Outcome`], never synchronously within the caller's stack.
pub trait Connection {
    /// The statement builder this backend pairs with.
    fn adapter(&self) -> &dyn Adapter;

    /// Execute a statement and return its full result.
    fn query(
        &self,
        cx: &Cx,
        statement: &Statement,
        params: &[Value],
    ) -> impl Future<Output = Outcome<QueryResult, Error>>;

    /// Execute a statement for its affected-row count only.
    fn execute(
        &self,
        cx: &Cx,
        statement: &Statement,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> {
        async move {
            match self.query(cx, statement, params).await {
                Outcome::Ok(result) => Outcome::Ok(result.rows_affected),
                Outcome::Err(e) => Outcome::Err(e),
                Outcome::Cancelled(r) => Outcome::Cancelled(r),
                Outcome::Panicked(p) => Outcome::Panicked(p),
            }
        }
    }
}
