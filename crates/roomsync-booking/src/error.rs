//! Error types for the downstream adapters.

use thiserror::Error;

/// Result type alias using [`BookingError`].
pub type BookingResult<T> = Result<T, BookingError>;

/// Errors from the Booking and Asset service clients.
#[derive(Debug, Error)]
pub enum BookingError {
    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with an unexpected status.
    #[error("unexpected status code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// A payload could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL cannot be turned into a WebSocket URL.
    #[error("invalid base URL: {0}")]
    InvalidUrl(String),
}

impl From<tokio_tungstenite::tungstenite::Error> for BookingError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        BookingError::WebSocket(Box::new(e))
    }
}
