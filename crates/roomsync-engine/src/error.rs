//! Error types for the engine.

use thiserror::Error;

/// Result type alias using [`EngineError`].
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors crossing the engine's loop boundaries.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Identity store failure.
    #[error(transparent)]
    Db(#[from] roomsync_db::DbError),

    /// Exchange adapter failure.
    #[error(transparent)]
    Ews(#[from] roomsync_ews::EwsError),

    /// Booking or Asset service failure.
    #[error(transparent)]
    Booking(#[from] roomsync_booking::BookingError),

    /// The configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] roomsync_core::ConfigError),

    /// An asset filter rule carries an invalid regex.
    #[error("invalid asset filter: {0}")]
    Filter(#[from] regex::Error),

    /// The configuration has not been persisted yet.
    #[error("configuration has no id")]
    UnsavedConfiguration,
}
