//! Common error types for gpeval

use thiserror::Error;

/// Common result type for gpeval operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across gpeval services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Presenter name rejected before resolution (empty or over-long)
    #[error("Invalid presenter name: {0}")]
    InvalidName(String),

    /// Bulk request exceeds the batch size cap; nothing was applied
    #[error("Batch too large: {size} items (maximum {max})")]
    BatchTooLarge { size: usize, max: usize },

    /// Single-item mutation on a presenter outside the caller's scope
    #[error("Out of scope: {0}")]
    OutOfScope(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the whole request was malformed, as opposed to a failure that
    /// only affects one item of a batch.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidName(_)
                | Error::BatchTooLarge { .. }
                | Error::InvalidInput(_)
                | Error::OutOfScope(_)
        )
    }

    /// True for store failures that may succeed on retry (lock contention,
    /// exhausted pool). Bulk paths record these per item and keep going.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Database(sqlx::Error::PoolTimedOut) => true,
            Error::Database(sqlx::Error::Io(_)) => true,
            Error::Database(sqlx::Error::Database(db_err)) => {
                // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes
                db_err
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    .map(|code| matches!(code & 0xff, 5 | 6))
                    .unwrap_or(false)
            }
            _ => false,
        }
    }
}
