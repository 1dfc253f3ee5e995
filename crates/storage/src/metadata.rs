//! Sequence metadata for the `events` table.
//!
//! Both readers run one aggregate query and accept only 0 or 1 result rows.
//! Anything else means the execution path is broken and fails loudly.

use crate::integer::coerce_integer;
use crate::transport::{Executor, QueryResult};
use crate::{Error, Result};
use serde_json::Value;
use tracing::{debug, warn};

pub const MAX_ID_SQL: &str = r#"SELECT max(id) AS "maxId" FROM events"#;
pub const COUNT_SQL: &str = r#"SELECT count(*) AS "count" FROM events"#;

/// Largest assigned event id, or 0 when the table is empty.
///
/// Ids start at 1, so a non-positive maximum fails with
/// [`Error::InvalidMaximumId`].
pub async fn get_maximum_event_id<C: Executor>(conn: &C) -> Result<i64> {
    let result = conn.execute(MAX_ID_SQL).await?;
    let Some(value) = single_value(conn, result, "maxId")? else {
        debug!(database = conn.database(), "No events, maximum id is 0");
        return Ok(0);
    };

    let max_id = coerce_integer(&value)?;
    if max_id <= 0 {
        warn!(database = conn.database(), max_id, "Invalid maximum event id");
        return Err(Error::InvalidMaximumId {
            max_id,
            database: conn.database().to_string(),
        });
    }

    debug!(database = conn.database(), max_id, "Read maximum event id");
    Ok(max_id)
}

/// Number of rows in the events table.
pub async fn get_event_count<C: Executor>(conn: &C) -> Result<i64> {
    let result = conn.execute(COUNT_SQL).await?;
    let count = match single_value(conn, result, "count")? {
        Some(value) => coerce_integer(&value)?,
        None => 0,
    };

    debug!(database = conn.database(), count, "Read event count");
    Ok(count)
}

/// Extract `column` from an aggregate result.
///
/// `None` covers both "no row" and "row holding null".
fn single_value<C: Executor>(
    conn: &C,
    mut result: QueryResult,
    column: &str,
) -> Result<Option<Value>> {
    let row_count = result.row_count;
    let invalid_row_count = || Error::InvalidRowCount {
        row_count,
        database: conn.database().to_string(),
    };

    match row_count {
        0 => Ok(None),
        1 => {
            let Some(row) = result.rows.first_mut() else {
                warn!(database = conn.database(), "Row count 1 reported without a row");
                return Err(invalid_row_count());
            };
            match row.take(column) {
                Some(Value::Null) => Ok(None),
                Some(value) => Ok(Some(value)),
                None => Err(Error::MissingColumn {
                    column: column.to_string(),
                }),
            }
        }
        row_count => {
            warn!(database = conn.database(), row_count, "Unexpected aggregate row count");
            Err(invalid_row_count())
        }
    }
}
