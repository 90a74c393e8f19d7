//! Booking group rows: one per Exchange UID.

use sqlx::PgPool;

use crate::error::{DbError, DbResult};

/// A reservation as stored, unique by `exchange_uid`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingGroupRow {
    pub id: i64,
    pub exchange_uid: String,
    pub organizer_mailbox: String,
    pub downstream_id: Option<i32>,
}

impl BookingGroupRow {
    /// Look up a group by its Exchange UID.
    pub async fn by_exchange_uid(pool: &PgPool, uid: &str) -> DbResult<Self> {
        let row: Option<Self> = sqlx::query_as("SELECT * FROM booking_group WHERE exchange_uid = $1")
            .bind(uid)
            .fetch_optional(pool)
            .await?;
        row.ok_or(DbError::NotFound("booking group"))
    }

    /// Look up a group by its downstream group identifier.
    pub async fn by_downstream_id(pool: &PgPool, downstream_id: i32) -> DbResult<Self> {
        let row: Option<Self> =
            sqlx::query_as("SELECT * FROM booking_group WHERE downstream_id = $1")
                .bind(downstream_id)
                .fetch_optional(pool)
                .await?;
        row.ok_or(DbError::NotFound("booking group"))
    }

    /// Look up the group owning an event id seen in a resource
    /// mailbox, joining through room bookings and occurrences.
    pub async fn by_exchange_room_event_id(pool: &PgPool, exchange_id: &str) -> DbResult<Self> {
        let row: Option<Self> = sqlx::query_as(
            r"
            SELECT g.* FROM booking_group g
            JOIN booking_occurrence o ON o.booking_group_id = g.id
            JOIN room_booking r ON r.booking_occurrence_id = o.id
            WHERE r.exchange_id = $1
            ",
        )
        .bind(exchange_id)
        .fetch_optional(pool)
        .await?;
        row.ok_or(DbError::NotFound("booking group"))
    }
}
