//! Common error types for GPROG

use thiserror::Error;

/// Common result type for GPROG operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds shared by the catalog store and the HTTP layer
///
/// The first group are validation failures, detected before any write is
/// issued. The second group wraps infrastructure failures; any of them
/// aborts the in-flight transaction.
#[derive(Error, Debug)]
pub enum Error {
    /// Required input absent
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Date/time parse failure or malformed filter value
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Referenced id does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Natural-key collision
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Announcer/station pair already associated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Bank entry references a pair lacking an active association
    #[error("Not associated: {0}")]
    NotAssociated(String),

    /// Value outside its permitted range
    #[error("Out of range: {0}")]
    OutOfRange(String),

    /// Delete blocked by referencing rows
    #[error("Has dependents: {0}")]
    HasDependents(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Error::MissingField(_) => "MISSING_FIELD",
            Error::InvalidFormat(_) => "INVALID_FORMAT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::DuplicateKey(_) => "DUPLICATE_KEY",
            Error::Conflict(_) => "CONFLICT",
            Error::NotAssociated(_) => "NOT_ASSOCIATED",
            Error::OutOfRange(_) => "OUT_OF_RANGE",
            Error::HasDependents(_) => "HAS_DEPENDENTS",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Io(_) => "IO_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// True for failures caused by the request rather than the server
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            Error::Database(_) | Error::Io(_) | Error::Config(_) | Error::Internal(_)
        )
    }
}

/// Map a write failure, turning a UNIQUE constraint violation into `on_unique`
///
/// Pre-checks only give an early exit; the constraint is what actually
/// rejects a concurrent duplicate.
pub fn map_unique_violation(err: sqlx::Error, on_unique: impl FnOnce() -> Error) -> Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => on_unique(),
        _ => Error::Database(err),
    }
}
