//! Client-side access to an append-only `events` table.
//!
//! The crate sits between callers and whatever executes SQL for them. It
//! never opens transactions, retries or pools connections; it issues
//! statements through an [`Executor`] and validates what comes back.
//!
//! # Overview
//!
//! Three capabilities make up the crate:
//!
//! 1. **Sequence metadata** — [`get_maximum_event_id`] and [`get_event_count`]
//!    run one aggregate query each and reject any result that is not exactly
//!    zero or one row.
//!
//! 2. **Insert encoding** — [`create_insert_events_sql_statement`] turns an
//!    ordered batch of events into a single call of the `insert_events`
//!    stored procedure. Tuple `i` references id placeholder `$1[i]`, so the
//!    id array bound at execution time must follow the same order.
//!
//! 3. **Stream draining** — [`get_events_from_stream`] pulls at most
//!    `max_events` events from an [`EventSource`] and reports whether the
//!    source ran dry.
//!
//! # Appending events
//!
//! ```no_run
//! use storage::{SqliteConnection, create_insert_events_sql_statement, get_maximum_event_id};
//! use serde_json::json;
//!
//! # async fn example() -> storage::Result<()> {
//! let conn = SqliteConnection::open("events.db")?;
//! let events = vec![json!({"type": "created"}), json!({"type": "renamed"})];
//!
//! let max_id = get_maximum_event_id(&conn).await?;
//! let insert = create_insert_events_sql_statement(&events)?.bind(max_id, chrono::Utc::now())?;
//!
//! // insert.sql runs with insert.ids as $1 and insert.timestamp as $2
//! assert_eq!(insert.ids, vec![max_id + 1, max_id + 2]);
//! # Ok(())
//! # }
//! ```
//!
//! # Reading back
//!
//! ```no_run
//! use storage::{Executor, SqliteConnection, get_events_from_stream};
//!
//! # async fn example() -> storage::Result<()> {
//! let conn = SqliteConnection::open("events.db")?;
//! let result = conn.execute("SELECT event FROM events ORDER BY id").await?;
//! let mut source = result.into_column_source("event");
//!
//! loop {
//!     let batch = get_events_from_stream(&mut source, 100).await?;
//!     for event in &batch.events {
//!         println!("{event}");
//!     }
//!     if batch.end_of_stream {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod insert;
mod integer;
mod metadata;
mod sqlite;
mod stream;
mod transport;

pub use error::{BoxError, Error, Result};
pub use insert::{
    BoundInsert, InsertStatement, create_insert_events_sql_statement,
    create_insert_events_sql_statement_from_batches, escape_literal, unescape_literal,
};
pub use integer::coerce_integer;
pub use metadata::{COUNT_SQL, MAX_ID_SQL, get_event_count, get_maximum_event_id};
pub use sqlite::SqliteConnection;
pub use stream::{EventSource, IterSource, StreamResult, get_events_from_stream};
pub use transport::{Executor, QueryResult, Row};
