//! Typed views of the EWS payloads the engine works with.

use chrono::{DateTime, Utc};

/// A calendar item as reported by `SyncFolderItems` or `GetItem`.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarItem {
    /// Opaque per-mailbox item identifier.
    pub item_id: String,
    /// Version token required on update or cancel.
    pub change_key: String,
    /// Calendar UID, stable across mailboxes.
    pub uid: String,
    pub subject: String,
    /// 1-based ordinal within a recurring master; 0 for singletons.
    pub instance_index: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Organizer address, either SMTP or a legacy DN still to be resolved.
    pub organizer_email: String,
    /// `Single`, `RecurringMaster`, `Occurrence`, `Exception`.
    pub calendar_item_type: String,
}

impl CalendarItem {
    /// Whether this item is the template of a recurring series. The
    /// master itself must never be booked; only its expanded
    /// instances are.
    #[must_use]
    pub fn is_recurring_master(&self) -> bool {
        self.calendar_item_type == "RecurringMaster"
    }
}

/// One page of a `SyncFolderItems` response.
#[derive(Debug, Clone, Default)]
pub struct SyncPage {
    /// Opaque cookie resuming the change stream after this page.
    pub sync_state: String,
    /// When false, further pages remain and the caller must loop.
    pub includes_last_item: bool,
    pub creates: Vec<CalendarItem>,
    pub updates: Vec<CalendarItem>,
    /// ItemIds of deleted events; the items themselves are gone.
    pub deletes: Vec<String>,
}

/// An appointment to create on behalf of an organizer.
#[derive(Debug, Clone)]
pub struct Appointment {
    pub organizer: String,
    pub subject: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: String,
    /// Room mailboxes, invited as required attendees.
    pub attendees: Vec<String>,
}
