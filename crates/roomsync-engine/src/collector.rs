//! Exchange → Booking collector (one pass per refresh tick).

use std::collections::{hash_map::Entry, HashMap};
use std::time::Duration;

use roomsync_booking::{BookingClient, GroupRequest, GroupResponse, OccurrenceRequest};
use roomsync_core::{BookingGroup, BookingOccurrence, Configuration, RoomBooking};
use roomsync_db::models::{Asset, BookingGroupRow, BookingOccurrenceRow};
use roomsync_db::{upsert_group_tree, GroupTree, OccurrenceNode, RoomBookingNode};
use roomsync_ews::{CalendarItem, EwsClient};
use sqlx::PgPool;
use tracing::{debug, error, info};

use crate::assets::{self, AssetDirectory};
use crate::error::{EngineError, EngineResult};
use crate::{ExchangeLock, ResubscribeTrigger};

/// Run one collector pass for a configuration.
///
/// Discovery first (when a room list is configured), then a per-asset
/// incremental pull under the Exchange lock, then the accumulated
/// pushes to the Booking service. Push failures are logged and do not
/// abort the remaining work; sync cookies are already persisted, so a
/// retry on the next tick will not replay Exchange history.
pub async fn collect(
    pool: &PgPool,
    config: &Configuration,
    exchange: &ExchangeLock,
    directory: &dyn AssetDirectory,
    resubscribe: &ResubscribeTrigger,
) -> EngineResult<()> {
    let config_id = config.id.ok_or(EngineError::UnsavedConfiguration)?;
    // A fresh client per pass keeps the DN cache lifetime bounded.
    let ews = EwsClient::new(config)?;

    if config.room_list().is_some() {
        let created = assets::discover_rooms(pool, config, &ews, directory).await?;
        if created > 0 {
            // The watched-asset set grew; the subscription must be
            // reopened to cover the new rooms.
            resubscribe.fire();
            assets::mark_all_bookable(pool, config_id, directory).await?;
        }
    }

    let mut to_book: HashMap<String, BookingGroup> = HashMap::new();
    let mut cancelled_downstream: Vec<i32> = Vec::new();
    let mut asset_rows: HashMap<i32, i64> = HashMap::new();

    for asset in Asset::for_configuration(pool, config_id).await? {
        let Some(downstream_asset_id) = asset.asset_id else {
            continue;
        };
        if asset.provider_id.is_empty() {
            continue;
        }
        asset_rows.insert(downstream_asset_id, asset.id);

        let guard = exchange.lock().await;
        let mut sync_state = Asset::sync_state(pool, asset.id).await?;
        loop {
            let page = ews.sync_folder_items(&asset.provider_id, &sync_state).await?;
            let last_page = page.includes_last_item;

            for item in page.creates.into_iter().chain(page.updates) {
                let group = build_group(&ews, &asset.provider_id, downstream_asset_id, item).await?;
                merge_group(&mut to_book, group);
            }
            for deleted_item_id in &page.deletes {
                match BookingGroupRow::by_exchange_room_event_id(pool, deleted_item_id).await {
                    Ok(row) => {
                        if let Some(downstream_id) = row.downstream_id {
                            cancelled_downstream.push(downstream_id);
                        }
                    }
                    // Never seen or never synced downstream; it is
                    // gone either way.
                    Err(e) if e.is_not_found() => {}
                    Err(e) => return Err(e.into()),
                }
            }

            // Persist each page so a crash resumes mid-history.
            Asset::persist_sync_state(pool, asset.id, &page.sync_state).await?;
            sync_state = page.sync_state;
            if last_page {
                break;
            }
        }
        drop(guard);
    }

    let mut groups: Vec<BookingGroup> = to_book.into_values().collect();
    groups.sort_by(|a, b| a.exchange_uid.cmp(&b.exchange_uid));
    for group in &mut groups {
        assign_identity(pool, group).await?;
    }

    let booking = BookingClient::with_timeout(
        &config.booking_url,
        Duration::from_secs(config.request_timeout.max(1) as u64),
    )?;
    for group in groups {
        if group.occurrences.is_empty() {
            continue;
        }
        let uid = group.exchange_uid.clone();
        if let Err(e) = push_group(pool, &booking, group, &asset_rows).await {
            error!(config = config_id, uid = %uid, error = %e, "pushing booking group");
        }
    }
    for downstream_id in cancelled_downstream {
        if let Err(e) = booking.cancel(downstream_id, "cancelled").await {
            error!(config = config_id, booking = downstream_id, error = %e, "cancelling booking");
        }
    }

    Ok(())
}

/// Build a group from one change-feed item. Recurring masters are
/// replaced by their expanded instances. The master itself is a
/// redundant occurrence and must not be booked.
async fn build_group(
    ews: &EwsClient,
    room_mailbox: &str,
    downstream_asset_id: i32,
    item: CalendarItem,
) -> EngineResult<BookingGroup> {
    let organizer_email = ews.resolve_dn(&item.organizer_email).await?;

    let items = if item.is_recurring_master() {
        let expanded = ews
            .expand_recurring_master(&item.item_id, room_mailbox)
            .await?;
        debug!(master = %item.item_id, instances = expanded.len(), "recurring master expanded");
        expanded
    } else {
        vec![item.clone()]
    };

    Ok(BookingGroup {
        downstream_id: None,
        exchange_uid: item.uid,
        organizer_email,
        occurrences: items
            .into_iter()
            .map(|instance| BookingOccurrence {
                downstream_id: None,
                instance_index: instance.instance_index,
                start: instance.start,
                end: instance.end,
                cancelled: false,
                room_bookings: vec![RoomBooking {
                    asset_id: downstream_asset_id,
                    resource_event_id: instance.item_id,
                }],
            })
            .collect(),
    })
}

/// Merge a group into the per-pass accumulator. Groups sharing a UID
/// across rooms merge by instance index; their room bookings
/// concatenate.
pub(crate) fn merge_group(accumulator: &mut HashMap<String, BookingGroup>, group: BookingGroup) {
    match accumulator.entry(group.exchange_uid.clone()) {
        Entry::Vacant(slot) => {
            slot.insert(group);
        }
        Entry::Occupied(mut slot) => {
            let existing = slot.get_mut();
            for occurrence in group.occurrences {
                if let Some(known) = existing
                    .occurrences
                    .iter_mut()
                    .find(|o| o.instance_index == occurrence.instance_index)
                {
                    known.room_bookings.extend(occurrence.room_bookings);
                } else {
                    existing.occurrences.push(occurrence);
                }
            }
        }
    }
}

/// Copy known downstream identifiers onto a freshly built group and
/// append synthetic cancellations for downstream-known occurrences
/// absent from this pass. This is how occurrence deletions surface
/// when Exchange reports only the master change.
async fn assign_identity(pool: &PgPool, group: &mut BookingGroup) -> EngineResult<()> {
    let row = match BookingGroupRow::by_exchange_uid(pool, &group.exchange_uid).await {
        Ok(row) => row,
        // The group is new.
        Err(e) if e.is_not_found() => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    let Some(downstream_group_id) = row.downstream_id else {
        // Known, but not yet synced downstream.
        return Ok(());
    };
    group.downstream_id = Some(downstream_group_id);

    let keep: Vec<i32> = group
        .occurrences
        .iter()
        .map(|o| o.instance_index)
        .collect();

    for occurrence in &mut group.occurrences {
        if let Some(known) =
            BookingOccurrenceRow::find(pool, row.id, occurrence.instance_index).await?
        {
            occurrence.downstream_id = known.downstream_id;
        }
    }

    for gone in BookingOccurrenceRow::in_group_except(pool, row.id, &keep).await? {
        info!(
            uid = %group.exchange_uid,
            instance_index = gone.exchange_instance_index,
            "occurrence no longer enumerated; cancelling downstream"
        );
        group.occurrences.push(BookingOccurrence {
            downstream_id: gone.downstream_id,
            instance_index: gone.exchange_instance_index,
            start: gone.start_at,
            end: gone.end_at,
            cancelled: true,
            room_bookings: Vec::new(),
        });
    }
    Ok(())
}

/// Push one group and record the identifiers the response assigned.
async fn push_group(
    pool: &PgPool,
    booking: &BookingClient,
    group: BookingGroup,
    asset_rows: &HashMap<i32, i64>,
) -> EngineResult<()> {
    let request = GroupRequest {
        group_id: group.downstream_id,
        occurrences: group
            .occurrences
            .iter()
            .map(|o| OccurrenceRequest {
                booking_id: o.downstream_id,
                asset_ids: o.asset_ids(),
                organizer_id: group.organizer_email.clone(),
                start: o.start,
                end: o.end,
                cancelled: o.cancelled,
            })
            .collect(),
    };
    let response = booking.book_group(&request).await?;
    let tree = paired_tree(&group, &response, asset_rows);
    upsert_group_tree(pool, &tree).await?;
    Ok(())
}

/// Pair a pushed group with its response positionally (the Booking
/// service returns occurrences in request order) and produce the
/// tree to persist.
pub(crate) fn paired_tree(
    group: &BookingGroup,
    response: &GroupResponse,
    asset_rows: &HashMap<i32, i64>,
) -> GroupTree {
    GroupTree {
        exchange_uid: group.exchange_uid.clone(),
        organizer_mailbox: group.organizer_email.clone(),
        downstream_id: Some(response.id),
        occurrences: group
            .occurrences
            .iter()
            .enumerate()
            .map(|(position, occurrence)| OccurrenceNode {
                instance_index: occurrence.instance_index,
                start: occurrence.start,
                end: occurrence.end,
                cancelled: occurrence.cancelled,
                downstream_id: response
                    .bookings
                    .get(position)
                    .map(|b| b.id)
                    .or(occurrence.downstream_id),
                room_bookings: occurrence
                    .room_bookings
                    .iter()
                    .filter_map(|rb| {
                        asset_rows.get(&rb.asset_id).map(|&asset_row_id| {
                            RoomBookingNode {
                                asset_row_id,
                                exchange_id: rb.resource_event_id.clone(),
                            }
                        })
                    })
                    .collect(),
            })
            .collect(),
    }
}
