//! SQL execution transport.
//!
//! The access layer never talks to a driver directly. It hands statement
//! text to an [`Executor`] and inspects the [`QueryResult`] it gets back.

use crate::stream::IterSource;
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::future::Future;

/// One result row, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(Map<String, Value>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly useful when scripting results.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn take(&mut self, column: &str) -> Option<Value> {
        self.0.remove(column)
    }
}

/// Rows produced by one statement plus the count the driver reported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: usize,
}

impl QueryResult {
    /// Result whose row count is the number of materialized rows.
    pub fn new(rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self { rows, row_count }
    }

    /// Expose the rows as a pull source yielding `column` of each row in order.
    ///
    /// A row without the column fails the pull that reaches it.
    pub fn into_column_source(
        self,
        column: impl Into<String>,
    ) -> IterSource<impl Iterator<Item = Result<Value>> + Send> {
        let column = column.into();
        IterSource::new(self.rows.into_iter().map(move |mut row| {
            row.take(&column).ok_or_else(|| Error::MissingColumn {
                column: column.clone(),
            })
        }))
    }
}

/// A connection capable of executing SQL text.
///
/// Implementations own connection handling. Errors they return are passed
/// through to callers untouched.
pub trait Executor: Send + Sync {
    /// Database identifier, used in diagnostics.
    fn database(&self) -> &str;

    /// Execute a statement and materialize its result.
    fn execute(&self, sql: &str) -> impl Future<Output = Result<QueryResult>> + Send;
}
