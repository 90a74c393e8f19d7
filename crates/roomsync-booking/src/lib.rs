//! Downstream service adapters.
//!
//! [`BookingClient`] talks to the Booking service: group
//! create/update, cancellation with a reason, and a WebSocket
//! subscription streaming booking changes for a set of assets.
//! [`AssetClient`] talks to the Asset service that registers rooms
//! downstream and notifies users. Every mutating call identifies this
//! application through the `clientReference` query parameter.

mod assets;
mod client;
mod error;
mod subscription;
mod types;

pub use assets::{AssetClient, CreateAssetRequest};
pub use client::{BookingClient, CLIENT_REFERENCE};
pub use error::{BookingError, BookingResult};
pub use types::{GroupRequest, GroupResponse, OccurrenceRequest, OccurrenceResponse};
