//! Transactional upsert of a group with its occurrences and room
//! bookings.
//!
//! Upsert keys: the group's Exchange UID, the occurrence's
//! (group, instance index), the room booking's resource-mailbox event
//! id. Replaying the same tree is a no-op; a conflicting room booking
//! insert does nothing. No write is partial: the whole tree goes
//! through one transaction.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::DbResult;

/// A group tree to persist.
#[derive(Debug, Clone)]
pub struct GroupTree {
    pub exchange_uid: String,
    pub organizer_mailbox: String,
    pub downstream_id: Option<i32>,
    pub occurrences: Vec<OccurrenceNode>,
}

/// An occurrence within a [`GroupTree`].
#[derive(Debug, Clone)]
pub struct OccurrenceNode {
    pub instance_index: i32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub cancelled: bool,
    pub downstream_id: Option<i32>,
    pub room_bookings: Vec<RoomBookingNode>,
}

/// A room booking within an [`OccurrenceNode`].
#[derive(Debug, Clone)]
pub struct RoomBookingNode {
    /// Row id of the room asset (not the downstream id).
    pub asset_row_id: i64,
    /// Event id inside the resource mailbox.
    pub exchange_id: String,
}

/// Upsert a full group tree atomically and return the group row id.
///
/// Downstream identifiers are only ever filled in, never cleared:
/// an upsert carrying `None` keeps a previously stored id.
pub async fn upsert_group_tree(pool: &PgPool, tree: &GroupTree) -> DbResult<i64> {
    let mut tx = pool.begin().await?;

    let (group_id,): (i64,) = sqlx::query_as(
        r"
        INSERT INTO booking_group (exchange_uid, organizer_mailbox, downstream_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (exchange_uid) DO UPDATE SET
            organizer_mailbox = EXCLUDED.organizer_mailbox,
            downstream_id = COALESCE(EXCLUDED.downstream_id, booking_group.downstream_id)
        RETURNING id
        ",
    )
    .bind(&tree.exchange_uid)
    .bind(&tree.organizer_mailbox)
    .bind(tree.downstream_id)
    .fetch_one(&mut *tx)
    .await?;

    for occurrence in &tree.occurrences {
        let (occurrence_id,): (i64,) = sqlx::query_as(
            r"
            INSERT INTO booking_occurrence (
                booking_group_id, exchange_instance_index, start_at, end_at,
                cancelled, downstream_id
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (booking_group_id, exchange_instance_index) DO UPDATE SET
                start_at = EXCLUDED.start_at,
                end_at = EXCLUDED.end_at,
                cancelled = EXCLUDED.cancelled,
                downstream_id = COALESCE(EXCLUDED.downstream_id, booking_occurrence.downstream_id)
            RETURNING id
            ",
        )
        .bind(group_id)
        .bind(occurrence.instance_index)
        .bind(occurrence.start)
        .bind(occurrence.end)
        .bind(occurrence.cancelled)
        .bind(occurrence.downstream_id)
        .fetch_one(&mut *tx)
        .await?;

        for room_booking in &occurrence.room_bookings {
            sqlx::query(
                r"
                INSERT INTO room_booking (booking_occurrence_id, asset_id, exchange_id)
                VALUES ($1, $2, $3)
                ON CONFLICT (exchange_id) DO NOTHING
                ",
            )
            .bind(occurrence_id)
            .bind(room_booking.asset_row_id)
            .bind(&room_booking.exchange_id)
            .execute(&mut *tx)
            .await?;
        }
    }

    tx.commit().await?;
    Ok(group_id)
}
