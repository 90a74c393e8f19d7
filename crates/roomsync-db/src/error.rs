//! Error types for the roomsync-db crate.

use thiserror::Error;

/// Result type alias using [`DbError`].
pub type DbResult<T> = Result<T, DbError>;

/// Database operation errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Failed to establish or acquire a database connection.
    #[error("database connection failed: {0}")]
    ConnectionFailed(#[source] sqlx::Error),

    /// A database migration failed to apply.
    #[error("migration failed: {0}")]
    MigrationFailed(#[source] sqlx::migrate::MigrateError),

    /// A database query failed to execute.
    #[error("query failed: {0}")]
    QueryFailed(#[from] sqlx::Error),

    /// Entity not found. Callers distinguish this from other failures;
    /// it usually means "new entity" rather than a fault.
    #[error("not found: {0}")]
    NotFound(&'static str),

    /// A stored value could not be interpreted.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl DbError {
    /// Check whether this is the not-found sentinel.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DbError::NotFound(_))
    }
}
