use thiserror::Error;

/// Boxed error returned by an arbitrary transport or event source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Storage errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A value expected to hold an id or a count is not an integer.
    #[error("{value} is not an integer")]
    NotAnInteger { value: String },

    /// An aggregate query returned something other than 0 or 1 rows.
    #[error("Row count ({row_count}) returned for SELECT statement is invalid for database {database}")]
    InvalidRowCount { row_count: usize, database: String },

    /// `max(id)` resolved to a non-positive value on a non-empty table.
    #[error("Maximum events.id ({max_id}) is invalid for database {database}")]
    InvalidMaximumId { max_id: i64, database: String },

    /// Assigning ids after `max_id` would overflow `i64`.
    #[error("cannot assign {count} event ids after {max_id}")]
    IdOverflow { max_id: i64, count: usize },

    /// A result row lacks the column the query aliased.
    #[error("column '{column}' missing from result row")]
    MissingColumn { column: String },

    /// A result cell cannot be represented as a JSON value (blobs, text that is not UTF-8).
    #[error("unsupported value in column '{column}'")]
    UnsupportedColumn { column: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failure reported by an external transport or event source.
    #[error("{0}")]
    Transport(#[source] BoxError),
}

impl Error {
    /// Wrap an arbitrary transport or source failure.
    pub fn transport(err: impl Into<BoxError>) -> Self {
        Self::Transport(err.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
