//! Encoding of multi-row inserts for the `insert_events` stored procedure.
//!
//! Every event becomes one tuple `($1[i], $2, '<json>')`:
//!
//! - `$1[i]` is the i-th (1-based) element of the id array bound at
//!   execution time,
//! - `$2` is the shared timestamp parameter,
//! - the third field is the event as JSON, single-quoted, with embedded
//!   single quotes doubled.
//!
//! The tuples are comma-joined and passed to the procedure as one
//! dollar-quoted blob: `SELECT insert_events($$...$$)`.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// An encoded insert together with the number of ids it expects in `$1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertStatement {
    pub sql: String,
    /// Length of the id array that must be bound as `$1`.
    pub event_count: usize,
}

/// An insert statement with its parameter values resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundInsert {
    pub sql: String,
    /// Value for `$1`; `ids[i - 1]` belongs to the tuple referencing `$1[i]`.
    pub ids: Vec<i64>,
    /// Value for `$2`.
    pub timestamp: DateTime<Utc>,
}

impl InsertStatement {
    /// The ids the statement's events receive when appended after `max_id`.
    ///
    /// Fails with [`Error::IdOverflow`] when the last id would not fit an `i64`.
    pub fn ids_after(&self, max_id: i64) -> Result<Vec<i64>> {
        let overflow = || Error::IdOverflow {
            max_id,
            count: self.event_count,
        };
        let count = i64::try_from(self.event_count).map_err(|_| overflow())?;
        max_id.checked_add(count).ok_or_else(overflow)?;
        Ok((1..=count).map(|i| max_id + i).collect())
    }

    /// Resolve `$1` and `$2` for an append following `max_id`.
    pub fn bind(self, max_id: i64, timestamp: DateTime<Utc>) -> Result<BoundInsert> {
        let ids = self.ids_after(max_id)?;
        Ok(BoundInsert {
            sql: self.sql,
            ids,
            timestamp,
        })
    }
}

/// Encode `events`, in order, into a single `insert_events` call.
pub fn create_insert_events_sql_statement<'a, E, I>(events: I) -> Result<InsertStatement>
where
    E: Serialize + 'a,
    I: IntoIterator<Item = &'a E>,
{
    let mut tuples: Vec<String> = Vec::new();
    for event in events {
        let json = serde_json::to_string(event)?;
        let idx = tuples.len() + 1;
        tuples.push(format!("($1[{idx}], $2, '{}')", escape_literal(&json)));
    }

    Ok(InsertStatement {
        sql: format!("SELECT insert_events($${}$$)", tuples.join(",")),
        event_count: tuples.len(),
    })
}

/// Encode nested batches, flattened one level, into a single `insert_events` call.
///
/// The output is identical to encoding the concatenated batches.
pub fn create_insert_events_sql_statement_from_batches<'a, E, B>(
    batches: &'a [B],
) -> Result<InsertStatement>
where
    E: Serialize + 'a,
    B: AsRef<[E]>,
{
    create_insert_events_sql_statement(batches.iter().flat_map(|batch| batch.as_ref()))
}

/// Double every single quote so `text` can sit inside a SQL string literal.
pub fn escape_literal(text: &str) -> String {
    text.replace('\'', "''")
}

/// Reverse of [`escape_literal`].
pub fn unescape_literal(text: &str) -> String {
    text.replace("''", "'")
}
