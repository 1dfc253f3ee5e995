//! SQLite executor.
//!
//! rusqlite calls block, so every statement runs on tokio's blocking pool
//! while the async caller waits on the join handle.

use crate::transport::{Executor, QueryResult, Row};
use crate::{Error, Result};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// [`Executor`] backed by a single SQLite connection.
pub struct SqliteConnection {
    conn: Arc<Mutex<Connection>>,
    database: String,
}

impl SqliteConnection {
    /// Open or create a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened SQLite database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            database: path.display().to_string(),
        })
    }

    /// Create an in-memory database (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            database: ":memory:".to_string(),
        })
    }

    /// Create the events table if it does not exist yet.
    pub async fn init_schema(&self) -> Result<()> {
        self.blocking(|conn| {
            conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS events (
                    id INTEGER PRIMARY KEY,
                    ts TEXT NOT NULL,
                    event TEXT NOT NULL
                );
                "#,
            )?;
            Ok(())
        })
        .await
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| Error::transport(format!("sqlite connection mutex poisoned: {e}")))?;
            f(&*guard)
        })
        .await
        .map_err(Error::transport)?
    }
}

impl Executor for SqliteConnection {
    fn database(&self) -> &str {
        &self.database
    }

    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        let sql = sql.to_string();
        self.blocking(move |conn| run(conn, &sql)).await
    }
}

fn run(conn: &Connection, sql: &str) -> Result<QueryResult> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut out = Row::new();
        for (idx, name) in columns.iter().enumerate() {
            out.insert(name.as_str(), cell_value(row.get_ref(idx)?, name)?);
        }
        rows.push(out);
    }

    // statements without result columns report affected rows instead
    let row_count = if columns.is_empty() {
        conn.changes() as usize
    } else {
        rows.len()
    };
    Ok(QueryResult { rows, row_count })
}

fn cell_value(value: ValueRef<'_>, column: &str) -> Result<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => return Err(unsupported(column)),
        },
        ValueRef::Blob(_) => return Err(unsupported(column)),
    })
}

fn unsupported(column: &str) -> Error {
    Error::UnsupportedColumn {
        column: column.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insert::create_insert_events_sql_statement;
    use crate::metadata::{get_event_count, get_maximum_event_id};
    use crate::stream::get_events_from_stream;
    use serde_json::json;

    async fn store() -> SqliteConnection {
        let conn = SqliteConnection::in_memory().unwrap();
        conn.init_schema().await.unwrap();
        conn
    }

    async fn insert(conn: &SqliteConnection, id: i64, event: &str) {
        conn.execute(&format!(
            "INSERT INTO events (id, ts, event) VALUES ({id}, '2024-01-01T00:00:00Z', '{event}')"
        ))
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn empty_table_metadata() {
        let conn = store().await;
        assert_eq!(get_maximum_event_id(&conn).await.unwrap(), 0);
        assert_eq!(get_event_count(&conn).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn populated_table_metadata() {
        let conn = store().await;
        for id in 1..=3 {
            insert(&conn, id, "{}").await;
        }
        assert_eq!(get_maximum_event_id(&conn).await.unwrap(), 3);
        assert_eq!(get_event_count(&conn).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn corrupt_ids_are_rejected() {
        let conn = store().await;
        insert(&conn, -3, "{}").await;
        let err = get_maximum_event_id(&conn).await.unwrap_err();
        assert!(matches!(err, Error::InvalidMaximumId { max_id: -3, .. }));
    }

    #[tokio::test]
    async fn non_query_reports_changes() {
        let conn = store().await;
        let result = conn
            .execute("INSERT INTO events (ts, event) VALUES ('t', '{}'), ('t', '{}')")
            .await
            .unwrap();
        assert!(result.rows.is_empty());
        assert_eq!(result.row_count, 2);
    }

    #[tokio::test]
    async fn blob_cells_are_unsupported() {
        let conn = store().await;
        let err = conn.execute("SELECT x'00' AS payload").await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedColumn { column } if column == "payload"));
    }

    #[tokio::test]
    async fn invalid_utf8_text_is_unsupported() {
        let conn = store().await;
        let err = conn
            .execute("SELECT CAST(x'ff' AS TEXT) AS event")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedColumn { column } if column == "event"));
    }

    #[tokio::test]
    async fn non_ascii_text_survives() {
        let conn = store().await;
        insert(&conn, 1, r#"{"name":"Zoë ☃"}"#).await;
        let result = conn.execute("SELECT event FROM events").await.unwrap();
        assert_eq!(result.rows[0].get("event"), Some(&json!(r#"{"name":"Zoë ☃"}"#)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_statements_share_the_connection() {
        let conn = store().await;
        for id in 1..=4 {
            insert(&conn, id, "{}").await;
        }

        let (max_id, count) = tokio::join!(get_maximum_event_id(&conn), get_event_count(&conn));
        assert_eq!(max_id.unwrap(), 4);
        assert_eq!(count.unwrap(), 4);
    }

    #[tokio::test]
    async fn bad_sql_surfaces_database_error() {
        let conn = store().await;
        let err = conn.execute("SELECT * FROM missing").await.unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }

    #[tokio::test]
    async fn stored_events_drain_in_id_order() {
        let conn = store().await;
        let events = [json!({"n": 1}), json!({"who": "O'Brien"}), json!({"n": 3})];

        // what insert_events would do with the encoded tuples
        let bound = create_insert_events_sql_statement(&events)
            .unwrap()
            .bind(get_maximum_event_id(&conn).await.unwrap(), chrono::Utc::now())
            .unwrap();
        for (id, event) in bound.ids.iter().zip(&events) {
            let text = crate::insert::escape_literal(&event.to_string());
            insert(&conn, *id, &text).await;
        }

        let result = conn
            .execute("SELECT event FROM events ORDER BY id")
            .await
            .unwrap();
        let mut source = result.into_column_source("event");

        let first = get_events_from_stream(&mut source, 2).await.unwrap();
        let rest = get_events_from_stream(&mut source, 2).await.unwrap();
        assert!(!first.end_of_stream);
        assert!(rest.end_of_stream);

        let decoded: Vec<serde_json::Value> = first
            .events
            .into_iter()
            .chain(rest.events)
            .map(|v| serde_json::from_str(v.as_str().unwrap()).unwrap())
            .collect();
        assert_eq!(decoded, events);
    }
}
