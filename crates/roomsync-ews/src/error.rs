//! Error types for the EWS adapter.

use thiserror::Error;

/// Result type alias using [`EwsError`].
pub type EwsResult<T> = Result<T, EwsError>;

/// Errors that can occur when talking to Exchange.
#[derive(Debug, Error)]
pub enum EwsError {
    /// The configuration carries no usable credentials.
    #[error("configuration error: {0}")]
    Config(#[from] roomsync_core::ConfigError),

    /// Token acquisition failed.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Transport-level HTTP error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response XML could not be read.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A SOAP fault other than the specifically mapped ones.
    #[error("SOAP fault: {response_code} - {message}")]
    Fault {
        response_code: String,
        message: String,
    },

    /// The SMTP address has no mailbox on this Exchange server.
    #[error("the SMTP address has no mailbox associated with it on this Exchange server")]
    NonExistentMailbox,

    /// A resource mailbox declined the invitation (no matching event
    /// found after the settle window).
    #[error("resource has declined the invitation")]
    Declined,

    /// No event with the requested UID exists in the mailbox.
    #[error("event not found in mailbox")]
    EventNotFound,

    /// The UID is not a hex string and cannot be converted to a
    /// GlobalObjectId.
    #[error("invalid UID: {0}")]
    InvalidUid(#[from] hex::FromHexError),

    /// The response did not match the expected shape.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
}
