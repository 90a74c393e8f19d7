//! Exchange Web Services adapter.
//!
//! Wraps the subset of EWS SOAP operations the sync engine needs:
//! room-list discovery, incremental calendar folder sync, recurrence
//! expansion, appointment creation/cancellation and distinguished-name
//! resolution. Requests impersonate either the configured service user
//! (`PrincipalName`) or a per-operation mailbox (`SmtpAddress`);
//! responses are decoded in two passes (SOAP Fault first, then the
//! expected shape) so a well-formed fault always surfaces as a typed
//! error.

mod auth;
mod client;
mod envelope;
mod error;
mod parse;
mod types;
mod uid;

pub use auth::{TokenCache, EXCHANGE_ONLINE_URL};
pub use client::{EwsClient, SETTLE_DELAY};
pub use error::{EwsError, EwsResult};
pub use types::{Appointment, CalendarItem, SyncPage};
pub use uid::global_object_id;
