//! In-memory storage backend for Rowbind.
//!
//! `MemoryConnection` implements the core `Connection` contract over plain
//! hash-map tables. It executes the structured plan carried by every
//! `Statement` instead of parsing SQL, which makes the full record
//! lifecycle (insert with server-assigned id, dirty-column update, delete)
//! exercisable in tests and demos without a database server.
//!
//! Semantics are deliberately small:
//!
//! - Inserting without an `id` column auto-assigns a monotonically
//!   increasing integer id, standing in for an auto-increment primary key.
//! - Insert and update return the affected rows, matching a `RETURNING *`
//!   clause.
//! - Matching is by value equality on the key columns.

use std::collections::HashMap;
use std::sync::Mutex;

use asupersync::{Cx, Outcome};
use rowbind_core::{Adapter, Connection, Error, Plan, QueryResult, Row, Statement, Value};
use rowbind_query::{Dialect, SqlAdapter};

#[derive(Default)]
struct Table {
    next_id: i64,
    rows: Vec<Row>,
}

impl Table {
    fn assign_id(&mut self, row: &Row) -> i64 {
        if self.next_id == 0 {
            self.next_id = 1;
        }
        if let Some(Value::Int(id)) = row.get("id") {
            if *id >= self.next_id {
                self.next_id = *id + 1;
            }
            *id
        } else {
            let id = self.next_id;
            self.next_id += 1;
            id
        }
    }
}

#[derive(Default)]
struct State {
    tables: HashMap<String, Table>,
    fail_next: Option<String>,
    statement_log: Vec<String>,
}

/// An in-memory database handle.
///
/// Interior locking makes the handle shareable by `&self`, matching the
/// `Connection` contract. One lock guards all tables; statements execute
/// atomically with respect to each other.
pub struct MemoryConnection {
    adapter: SqlAdapter,
    state: Mutex<State>,
}

impl MemoryConnection {
    /// A fresh, empty store rendering statements in the default dialect.
    #[must_use]
    pub fn new() -> Self {
        Self::with_dialect(Dialect::default())
    }

    /// A fresh, empty store for a specific SQL dialect.
    #[must_use]
    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            adapter: SqlAdapter::with_dialect(dialect),
            state: Mutex::new(State::default()),
        }
    }

    /// Make the next `query` call fail with `message`.
    ///
    /// Test hook for exercising storage-error paths.
    pub fn fail_next_query(&self, message: impl Into<String>) {
        self.state.lock().unwrap().fail_next = Some(message.into());
    }

    /// SQL text of every statement executed so far, in order.
    #[must_use]
    pub fn executed_statements(&self) -> Vec<String> {
        self.state.lock().unwrap().statement_log.clone()
    }

    /// Number of rows currently stored in `table`.
    #[must_use]
    pub fn table_len(&self, table: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map_or(0, |t| t.rows.len())
    }

    /// Snapshot of the rows currently stored in `table`.
    #[must_use]
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .map_or_else(Vec::new, |t| t.rows.clone())
    }

    fn run(&self, statement: &Statement, params: &[Value]) -> Result<QueryResult, Error> {
        let mut state = self.state.lock().unwrap();
        state.statement_log.push(statement.sql().to_string());
        if let Some(message) = state.fail_next.take() {
            return Err(Error::query(message));
        }

        match statement.plan() {
            Plan::Insert { table, columns } => {
                if columns.len() != params.len() {
                    return Err(Error::query("parameter count mismatch"));
                }
                let mut row = Row::new();
                for (column, value) in columns.iter().zip(params.iter()) {
                    row.set(column.clone(), value.clone());
                }
                let entry = state.tables.entry(table.clone()).or_default();
                let id = entry.assign_id(&row);
                if !row.contains("id") {
                    row.set("id", Value::Int(id));
                }
                tracing::debug!(table = %table, id = id, "memory insert");
                entry.rows.push(row.clone());
                Ok(QueryResult {
                    rows: vec![row],
                    rows_affected: 1,
                })
            }
            Plan::Update {
                table,
                columns,
                key_count,
            } => {
                if columns.len() != params.len() {
                    return Err(Error::query("parameter count mismatch"));
                }
                let keys: Vec<(&String, &Value)> = columns[..*key_count]
                    .iter()
                    .zip(params[..*key_count].iter())
                    .collect();
                let mut returned = Vec::new();
                if let Some(entry) = state.tables.get_mut(table) {
                    for row in &mut entry.rows {
                        if keys.iter().all(|(column, value)| {
                            row.get(column).is_some_and(|stored| stored == *value)
                        }) {
                            for (column, value) in
                                columns[*key_count..].iter().zip(params[*key_count..].iter())
                            {
                                row.set(column.clone(), value.clone());
                            }
                            returned.push(row.clone());
                        }
                    }
                }
                tracing::debug!(table = %table, matched = returned.len(), "memory update");
                Ok(QueryResult {
                    rows_affected: returned.len() as u64,
                    rows: returned,
                })
            }
            Plan::Delete { table, columns } => {
                if columns.len() != params.len() {
                    return Err(Error::query("parameter count mismatch"));
                }
                let keys: Vec<(&String, &Value)> =
                    columns.iter().zip(params.iter()).collect();
                let mut removed = 0u64;
                if let Some(entry) = state.tables.get_mut(table) {
                    entry.rows.retain(|row| {
                        let matches = keys.iter().all(|(column, value)| {
                            row.get(column).is_some_and(|stored| stored == *value)
                        });
                        if matches {
                            removed += 1;
                        }
                        !matches
                    });
                }
                tracing::debug!(table = %table, removed = removed, "memory delete");
                Ok(QueryResult {
                    rows: Vec::new(),
                    rows_affected: removed,
                })
            }
        }
    }
}

impl Default for MemoryConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection for MemoryConnection {
    fn adapter(&self) -> &dyn Adapter {
        &self.adapter
    }

    async fn query(
        &self,
        _cx: &Cx,
        statement: &Statement,
        params: &[Value],
    ) -> Outcome<QueryResult, Error> {
        match self.run(statement, params) {
            Ok(result) => Outcome::Ok(result),
            Err(e) => Outcome::Err(e),
        }
    }
}
