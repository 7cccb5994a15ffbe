//! Error types for the SQLite document store.

use record_codec_db::PersistenceError;
use thiserror::Error;

/// Errors that can occur in SQLite store and migration operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// A stored body is not valid JSON.
    #[error("document `{key}` has a malformed body: {source}")]
    MalformedBody {
        key: String,
        source: serde_json::Error,
    },

    /// A body could not be serialized.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Migration lifecycle operation failure.
    #[error("migration error: {0}")]
    MigrationError(String),

    /// Table prefix contains invalid characters.
    #[error("invalid prefix '{0}': must contain only alphanumeric characters and underscores")]
    InvalidPrefix(String),

    /// Another thread panicked while holding the connection.
    #[error("connection lock poisoned")]
    Poisoned,

    /// Error loading fixture documents or validating keys.
    #[error("loader error: {0}")]
    LoaderError(#[from] PersistenceError),
}

impl From<SqliteError> for PersistenceError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::LoaderError(inner) => inner,
            other => PersistenceError::Backend(other.to_string()),
        }
    }
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
