//! Error types for store operations

use std::fmt;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur while persisting or retiring samples
#[derive(Debug)]
pub enum StoreError {
    /// Opening the database failed
    ConnectionFailed(String),

    /// Schema initialization failed
    SchemaFailed(String),

    /// An insert or delete failed
    QueryFailed(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ConnectionFailed(msg) => {
                write!(f, "failed to open history database: {}", msg)
            }
            StoreError::SchemaFailed(msg) => {
                write!(f, "failed to initialize history schema: {}", msg)
            }
            StoreError::QueryFailed(msg) => write!(f, "history query failed: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::QueryFailed(err.to_string())
    }
}
