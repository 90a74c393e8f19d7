//! Booking occurrence rows: dated instances within a group.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{DbError, DbResult};

/// One dated instance, unique by (group, instance index).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingOccurrenceRow {
    pub id: i64,
    pub booking_group_id: i64,
    pub exchange_instance_index: i32,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub cancelled: bool,
    pub downstream_id: Option<i32>,
}

impl BookingOccurrenceRow {
    /// Look up an occurrence by its downstream identifier.
    pub async fn by_downstream_id(pool: &PgPool, downstream_id: i32) -> DbResult<Self> {
        let row: Option<Self> =
            sqlx::query_as("SELECT * FROM booking_occurrence WHERE downstream_id = $1")
                .bind(downstream_id)
                .fetch_optional(pool)
                .await?;
        row.ok_or(DbError::NotFound("booking occurrence"))
    }

    /// Fetch an occurrence by its group and instance index.
    pub async fn find(
        pool: &PgPool,
        booking_group_id: i64,
        instance_index: i32,
    ) -> DbResult<Option<Self>> {
        let row = sqlx::query_as(
            r"
            SELECT * FROM booking_occurrence
            WHERE booking_group_id = $1 AND exchange_instance_index = $2
            ",
        )
        .bind(booking_group_id)
        .bind(instance_index)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// All occurrences of a group.
    pub async fn in_group(pool: &PgPool, booking_group_id: i64) -> DbResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r"
            SELECT * FROM booking_occurrence
            WHERE booking_group_id = $1
            ORDER BY exchange_instance_index
            ",
        )
        .bind(booking_group_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Downstream-known occurrences of a group whose instance index is
    /// NOT in `keep`. Used to infer occurrence deletions when Exchange
    /// reports only the master change: everything previously known
    /// but absent from the current enumeration is cancelled.
    pub async fn in_group_except(
        pool: &PgPool,
        booking_group_id: i64,
        keep: &[i32],
    ) -> DbResult<Vec<Self>> {
        let rows = sqlx::query_as(
            r"
            SELECT * FROM booking_occurrence
            WHERE booking_group_id = $1
              AND downstream_id IS NOT NULL
              AND NOT (exchange_instance_index = ANY($2))
            ORDER BY exchange_instance_index
            ",
        )
        .bind(booking_group_id)
        .bind(keep)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Mark one occurrence cancelled.
    pub async fn mark_cancelled(pool: &PgPool, id: i64) -> DbResult<()> {
        sqlx::query("UPDATE booking_occurrence SET cancelled = TRUE WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark every occurrence of a group cancelled.
    pub async fn mark_group_cancelled(pool: &PgPool, booking_group_id: i64) -> DbResult<()> {
        sqlx::query("UPDATE booking_occurrence SET cancelled = TRUE WHERE booking_group_id = $1")
            .bind(booking_group_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
