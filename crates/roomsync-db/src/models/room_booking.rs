//! Room booking rows: an occurrence's event inside one room mailbox.

use sqlx::PgPool;

use crate::error::DbResult;

/// One occurrence as accepted by one room, unique by `exchange_id`
/// (the ItemId inside the resource mailbox).
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RoomBookingRow {
    pub id: i64,
    pub booking_occurrence_id: i64,
    pub asset_id: i64,
    pub exchange_id: String,
}

impl RoomBookingRow {
    /// All room bookings of one occurrence.
    pub async fn for_occurrence(pool: &PgPool, booking_occurrence_id: i64) -> DbResult<Vec<Self>> {
        let rows = sqlx::query_as(
            "SELECT * FROM room_booking WHERE booking_occurrence_id = $1 ORDER BY id",
        )
        .bind(booking_occurrence_id)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }
}
