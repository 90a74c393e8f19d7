//! Booking → Exchange writer.
//!
//! Consumes the Booking change stream for the watched-asset set and
//! mirrors the changes into Exchange on behalf of the organizers.
//! Every Exchange call runs under the process-wide Exchange lock; the
//! lock is NOT held across the settle window after `CreateItem` nor
//! across downstream HTTP.

use std::collections::HashMap;
use std::time::Duration;

use roomsync_booking::{BookingClient, GroupResponse};
use roomsync_core::Configuration;
use roomsync_db::models::{Asset, BookingGroupRow, BookingOccurrenceRow};
use roomsync_db::{upsert_group_tree, GroupTree, OccurrenceNode, RoomBookingNode};
use roomsync_ews::{Appointment, EwsClient, EwsError, SETTLE_DELAY};
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, EngineResult};
use crate::ExchangeLock;

/// Subject used for appointments created on behalf of organizers.
const BOOKING_SUBJECT: &str = "Booked via roomsync";

/// What to do with one stream message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WriterAction {
    /// The group's only occurrence is cancelled: cancel the whole
    /// Exchange event.
    CancelGroup,
    /// Some occurrences of a multi-occurrence group are cancelled:
    /// cancel each by downstream occurrence id.
    CancelOccurrences(Vec<i32>),
    /// A new booking to write into Exchange.
    Create,
    /// Nothing actionable.
    Skip(&'static str),
}

/// Classify a stream message.
///
/// Downstream creates carry exactly one occurrence per the current
/// contract; anything else is rejected rather than guessed at.
pub(crate) fn plan(message: &GroupResponse) -> WriterAction {
    let cancelled: Vec<i32> = message
        .bookings
        .iter()
        .filter(|b| b.cancelled)
        .map(|b| b.id)
        .collect();

    if cancelled.is_empty() {
        return match message.bookings.len() {
            1 => WriterAction::Create,
            0 => WriterAction::Skip("group carries no occurrences"),
            _ => WriterAction::Skip("multi-occurrence creation is unsupported"),
        };
    }
    if message.bookings.len() == 1 {
        return WriterAction::CancelGroup;
    }
    WriterAction::CancelOccurrences(cancelled)
}

/// Run one subscription session: open the stream for the currently
/// watched assets and consume it until the session token is
/// cancelled (re-subscribe or shutdown) or the stream ends.
pub async fn run_subscription(
    pool: &PgPool,
    config: &Configuration,
    exchange: &ExchangeLock,
    session: CancellationToken,
) -> EngineResult<()> {
    let config_id = config.id.ok_or(EngineError::UnsavedConfiguration)?;
    let asset_ids = Asset::watched_downstream_ids(pool, config_id).await?;
    let booking = BookingClient::with_timeout(
        &config.booking_url,
        Duration::from_secs(config.request_timeout.max(1) as u64),
    )?;

    let mut stream = booking.listen(session, asset_ids).await?;
    info!(config = config_id, "booking subscription consuming");

    while let Some(message) = stream.recv().await {
        handle_message(pool, config, exchange, &booking, message).await;
    }
    Ok(())
}

/// Process one stream message. Errors are logged and the stream keeps
/// going; one bad booking must not stall the subscription.
async fn handle_message(
    pool: &PgPool,
    config: &Configuration,
    exchange: &ExchangeLock,
    booking: &BookingClient,
    message: GroupResponse,
) {
    match plan(&message) {
        WriterAction::Skip(reason) => {
            warn!(booking = message.id, reason, "skipping booking message");
        }
        WriterAction::CancelGroup => {
            if let Err(e) = cancel_group(pool, config, exchange, message.id).await {
                error!(booking = message.id, error = %e, "cancelling event in Exchange");
            }
        }
        WriterAction::CancelOccurrences(occurrence_ids) => {
            for occurrence_id in occurrence_ids {
                if let Err(e) =
                    cancel_occurrence(pool, config, exchange, message.id, occurrence_id).await
                {
                    error!(
                        booking = message.id,
                        occurrence = occurrence_id,
                        error = %e,
                        "cancelling occurrence in Exchange"
                    );
                }
            }
        }
        WriterAction::Create => {
            if let Err(e) = create_booking(pool, config, exchange, booking, &message).await {
                error!(booking = message.id, error = %e, "writing booking into Exchange");
            }
        }
    }
}

async fn cancel_group(
    pool: &PgPool,
    config: &Configuration,
    exchange: &ExchangeLock,
    downstream_group_id: i32,
) -> EngineResult<()> {
    let _guard = exchange.lock().await;
    let group = BookingGroupRow::by_downstream_id(pool, downstream_group_id).await?;
    let ews = EwsClient::new(config)?;
    ews.cancel_event(&group.organizer_mailbox, &group.exchange_uid)
        .await?;
    BookingOccurrenceRow::mark_group_cancelled(pool, group.id).await?;
    debug!(booking = downstream_group_id, uid = %group.exchange_uid, "event cancelled");
    Ok(())
}

async fn cancel_occurrence(
    pool: &PgPool,
    config: &Configuration,
    exchange: &ExchangeLock,
    downstream_group_id: i32,
    downstream_occurrence_id: i32,
) -> EngineResult<()> {
    let _guard = exchange.lock().await;
    let group = BookingGroupRow::by_downstream_id(pool, downstream_group_id).await?;
    let occurrence = BookingOccurrenceRow::by_downstream_id(pool, downstream_occurrence_id).await?;
    let ews = EwsClient::new(config)?;
    ews.cancel_occurrence(
        &group.organizer_mailbox,
        &group.exchange_uid,
        occurrence.exchange_instance_index,
    )
    .await?;
    BookingOccurrenceRow::mark_cancelled(pool, occurrence.id).await?;
    debug!(
        booking = downstream_group_id,
        instance_index = occurrence.exchange_instance_index,
        "occurrence cancelled"
    );
    Ok(())
}

/// Write a downstream booking into Exchange.
///
/// State machine on the create outcome:
/// a declined invitation cancels the partially created Exchange event
/// and the downstream booking (reason "conflict"); a non-existent
/// organizer mailbox is retried once as the service user; any other
/// failure cancels the downstream booking (reason "error").
async fn create_booking(
    pool: &PgPool,
    config: &Configuration,
    exchange: &ExchangeLock,
    booking: &BookingClient,
    message: &GroupResponse,
) -> EngineResult<()> {
    let Some(occurrence) = message.bookings.first() else {
        return Ok(());
    };

    // The SOAP layer rejects an empty organizer outright; impersonate
    // the service user instead.
    let mut organizer = if occurrence.organizer_id.is_empty() {
        config.service_user_upn.clone()
    } else {
        occurrence.organizer_id.clone()
    };

    let mut attendees = Vec::with_capacity(occurrence.asset_ids.len());
    let mut asset_rows: HashMap<i32, i64> = HashMap::new();
    for asset_id in &occurrence.asset_ids {
        let asset = Asset::by_downstream_id(pool, *asset_id).await?;
        attendees.push(asset.provider_id.clone());
        asset_rows.insert(*asset_id, asset.id);
    }

    loop {
        let appointment = Appointment {
            organizer: organizer.clone(),
            subject: BOOKING_SUBJECT.to_string(),
            start: occurrence.start,
            end: occurrence.end,
            location: attendees.first().cloned().unwrap_or_default(),
            attendees: attendees.clone(),
        };

        match attempt_create(pool, config, exchange, message, &appointment, &asset_rows).await {
            Ok(()) => {
                debug!(booking = message.id, organizer = %organizer, "booking written to Exchange");
                return Ok(());
            }
            Err(EngineError::Ews(EwsError::Declined)) => {
                // The Exchange side was already cancelled under the
                // lock; report the conflict downstream.
                booking.cancel(message.id, "conflict").await?;
                debug!(booking = message.id, "conflicting booking cancelled");
                return Ok(());
            }
            Err(EngineError::Ews(EwsError::NonExistentMailbox))
                if organizer != config.service_user_upn =>
            {
                debug!(
                    booking = message.id,
                    organizer = %organizer,
                    "organizer mailbox missing; retrying as service user"
                );
                organizer = config.service_user_upn.clone();
            }
            Err(e) => {
                error!(booking = message.id, error = %e, "appointment creation failed");
                booking.cancel(message.id, "error").await?;
                return Ok(());
            }
        }
    }
}

/// One creation attempt: create under the lock, release it for the
/// settle window, re-acquire to confirm the resource acceptances and
/// record the identities.
async fn attempt_create(
    pool: &PgPool,
    config: &Configuration,
    exchange: &ExchangeLock,
    message: &GroupResponse,
    appointment: &Appointment,
    asset_rows: &HashMap<i32, i64>,
) -> EngineResult<()> {
    let ews = EwsClient::new(config)?;

    let exchange_uid = {
        let _guard = exchange.lock().await;
        ews.create_appointment(appointment).await?
    };

    // Exchange processes resource invitations asynchronously; search
    // the attendee mailboxes only after the settle window.
    tokio::time::sleep(SETTLE_DELAY).await;

    let _guard = exchange.lock().await;
    let resource_event_ids = match ews
        .find_resource_events(&exchange_uid, &appointment.attendees)
        .await
    {
        Ok(ids) => ids,
        Err(EwsError::Declined) => {
            // The event may be partially created in the organizer's
            // calendar and must not leak.
            ews.cancel_event(&appointment.organizer, &exchange_uid)
                .await?;
            return Err(EwsError::Declined.into());
        }
        Err(e) => return Err(e.into()),
    };

    let Some(occurrence) = message.bookings.first() else {
        return Ok(());
    };
    let tree = GroupTree {
        exchange_uid,
        organizer_mailbox: appointment.organizer.clone(),
        downstream_id: Some(message.id),
        occurrences: vec![OccurrenceNode {
            instance_index: 0,
            start: occurrence.start,
            end: occurrence.end,
            cancelled: false,
            downstream_id: Some(occurrence.id),
            room_bookings: occurrence
                .asset_ids
                .iter()
                .zip(&resource_event_ids)
                .filter_map(|(asset_id, event_id)| {
                    asset_rows.get(asset_id).map(|&asset_row_id| RoomBookingNode {
                        asset_row_id,
                        exchange_id: event_id.clone(),
                    })
                })
                .collect(),
        }],
    };
    upsert_group_tree(pool, &tree).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use roomsync_booking::OccurrenceResponse;

    fn occurrence(id: i32, cancelled: bool) -> OccurrenceResponse {
        OccurrenceResponse {
            id,
            asset_ids: vec![7],
            organizer_id: "alice@x.test".into(),
            organizer_name: String::new(),
            start: Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 2, 10, 30, 0).unwrap(),
            cancelled,
        }
    }

    fn message(bookings: Vec<OccurrenceResponse>) -> GroupResponse {
        GroupResponse { id: 9, bookings }
    }

    #[test]
    fn single_cancelled_occurrence_cancels_the_group() {
        let plan = plan(&message(vec![occurrence(12, true)]));
        assert_eq!(plan, WriterAction::CancelGroup);
    }

    #[test]
    fn partial_cancellation_targets_the_occurrences() {
        let plan = plan(&message(vec![
            occurrence(12, false),
            occurrence(13, true),
            occurrence(14, true),
        ]));
        assert_eq!(plan, WriterAction::CancelOccurrences(vec![13, 14]));
    }

    #[test]
    fn uncancelled_singleton_is_a_create() {
        let plan = plan(&message(vec![occurrence(12, false)]));
        assert_eq!(plan, WriterAction::Create);
    }

    #[test]
    fn multi_occurrence_create_is_rejected() {
        let plan = plan(&message(vec![occurrence(12, false), occurrence(13, false)]));
        assert!(matches!(plan, WriterAction::Skip(_)));
    }

    #[test]
    fn empty_group_is_skipped() {
        assert!(matches!(plan(&message(Vec::new())), WriterAction::Skip(_)));
    }
}
