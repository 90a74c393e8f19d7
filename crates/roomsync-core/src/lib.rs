//! Shared domain model for roomsync.
//!
//! This crate holds the types that flow between the Exchange adapter,
//! the Booking adapter and the sync engine: the in-memory reservation
//! model (group → occurrence → room booking), the per-tenant
//! configuration record with its typed credentials, and the asset
//! filter rules applied during room discovery.

mod config;
mod filter;
mod model;

pub use config::{ConfigError, Configuration, Credentials};
pub use filter::{matches_filter, FilterRule};
pub use model::{BookingGroup, BookingOccurrence, Room, RoomBooking};
