//! Wire shapes of the Booking service.

use chrono::{DateTime, Utc};
use roomsync_core::{BookingGroup, BookingOccurrence};
use serde::{Deserialize, Serialize};

/// Body of `POST /bookings/group`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupRequest {
    /// Present when updating a known group.
    #[serde(rename = "groupID", skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i32>,
    pub occurrences: Vec<OccurrenceRequest>,
}

/// One occurrence within a [`GroupRequest`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OccurrenceRequest {
    /// Present when updating a known occurrence.
    #[serde(rename = "bookingID", skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<i32>,
    #[serde(rename = "assetIds")]
    pub asset_ids: Vec<i32>,
    #[serde(rename = "organizerID")]
    pub organizer_id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub cancelled: bool,
}

/// Response of group mutations, `GET /bookings/{id}` and every
/// subscription message. Occurrences come back in request order; the
/// engine pairs identifiers positionally and that ordering is part of
/// the contract.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupResponse {
    pub id: i32,
    pub bookings: Vec<OccurrenceResponse>,
}

/// One occurrence within a [`GroupResponse`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OccurrenceResponse {
    pub id: i32,
    #[serde(rename = "assetIds", default)]
    pub asset_ids: Vec<i32>,
    #[serde(rename = "organizerID", default)]
    pub organizer_id: String,
    #[serde(rename = "organizerName", default, skip_serializing_if = "String::is_empty")]
    pub organizer_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub cancelled: bool,
}

/// Subscription envelope sent right after the WebSocket opens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SubscriptionRequest {
    #[serde(rename = "assetIDs")]
    pub asset_ids: Vec<i32>,
    #[serde(rename = "clientReference")]
    pub client_reference: String,
}

impl GroupResponse {
    /// Convert into the domain model. The Exchange identity is blank;
    /// booking-driven flows resolve it from the identity store. The
    /// instance index is unknown on this side and left at zero.
    #[must_use]
    pub fn into_group(self) -> BookingGroup {
        let organizer_email = self
            .bookings
            .first()
            .map(|b| b.organizer_id.clone())
            .unwrap_or_default();
        BookingGroup {
            downstream_id: Some(self.id),
            exchange_uid: String::new(),
            organizer_email,
            occurrences: self
                .bookings
                .into_iter()
                .map(|b| BookingOccurrence {
                    downstream_id: Some(b.id),
                    instance_index: 0,
                    start: b.start,
                    end: b.end,
                    cancelled: b.cancelled,
                    room_bookings: Vec::new(),
                })
                .collect(),
        }
    }

    /// Downstream asset ids referenced by any occurrence.
    #[must_use]
    pub fn asset_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .bookings
            .iter()
            .flat_map(|b| b.asset_ids.iter().copied())
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}
