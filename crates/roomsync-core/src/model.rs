//! In-memory reservation model shared by both sync directions.

use chrono::{DateTime, Utc};

/// A reservation as seen by its organizer.
///
/// One group corresponds to one calendar item UID in Exchange and to
/// one booking group downstream. Groups observed from Exchange carry a
/// room booking per resource mailbox the meeting was accepted in;
/// groups observed from the Booking stream carry downstream ids and
/// acquire their Exchange identity once written.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingGroup {
    /// Downstream group identifier, once known.
    pub downstream_id: Option<i32>,
    /// Calendar item UID, stable across mailboxes.
    pub exchange_uid: String,
    /// SMTP address of the organizer's mailbox.
    pub organizer_email: String,
    pub occurrences: Vec<BookingOccurrence>,
}

/// A single dated instance within a group.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingOccurrence {
    /// Downstream occurrence identifier, once known.
    pub downstream_id: Option<i32>,
    /// 1-based ordinal within a recurring master; 0 for singletons.
    pub instance_index: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub cancelled: bool,
    pub room_bookings: Vec<RoomBooking>,
}

impl BookingOccurrence {
    /// Downstream asset ids of every room this occurrence books.
    #[must_use]
    pub fn asset_ids(&self) -> Vec<i32> {
        self.room_bookings.iter().map(|rb| rb.asset_id).collect()
    }
}

/// The manifestation of one occurrence inside one room's mailbox.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomBooking {
    /// Downstream asset id of the room.
    pub asset_id: i32,
    /// Opaque Exchange ItemId of the event in the resource mailbox.
    pub resource_event_id: String,
}

/// A room resource managed in Exchange, as reported by `GetRooms`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    pub email: String,
    pub name: String,
}

impl Room {
    /// Stable identifier used when registering the room downstream.
    #[must_use]
    pub fn global_asset_id(&self) -> String {
        format!("exchange_room_{}", self.email)
    }
}
