//! Room asset rows: one per (configuration, project, room mailbox).

use sqlx::PgPool;

use crate::error::{DbError, DbResult};

/// A room known to the engine.
///
/// `provider_id` is the room mailbox SMTP address; `asset_id` is the
/// identifier assigned by the downstream Asset service (absent until
/// registration succeeds); `sync_state` is the opaque Exchange sync
/// cookie, empty before the first pass.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Asset {
    pub id: i64,
    pub configuration_id: i64,
    pub project_id: String,
    pub global_asset_id: String,
    pub provider_id: String,
    pub asset_id: Option<i32>,
    pub sync_state: String,
}

impl Asset {
    /// Insert a newly discovered room.
    pub async fn insert(
        pool: &PgPool,
        configuration_id: i64,
        project_id: &str,
        global_asset_id: &str,
        provider_id: &str,
        asset_id: i32,
    ) -> DbResult<Self> {
        let row = sqlx::query_as(
            r"
            INSERT INTO asset (configuration_id, project_id, global_asset_id, provider_id, asset_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            ",
        )
        .bind(configuration_id)
        .bind(project_id)
        .bind(global_asset_id)
        .bind(provider_id)
        .bind(asset_id)
        .fetch_one(pool)
        .await?;
        Ok(row)
    }

    /// Look up an asset by its discovery key.
    pub async fn find(
        pool: &PgPool,
        configuration_id: i64,
        project_id: &str,
        global_asset_id: &str,
    ) -> DbResult<Option<Self>> {
        let row = sqlx::query_as(
            r"
            SELECT * FROM asset
            WHERE configuration_id = $1 AND project_id = $2 AND global_asset_id = $3
            ",
        )
        .bind(configuration_id)
        .bind(project_id)
        .bind(global_asset_id)
        .fetch_optional(pool)
        .await?;
        Ok(row)
    }

    /// All assets of one configuration.
    pub async fn for_configuration(pool: &PgPool, configuration_id: i64) -> DbResult<Vec<Self>> {
        let rows = sqlx::query_as("SELECT * FROM asset WHERE configuration_id = $1 ORDER BY id")
            .bind(configuration_id)
            .fetch_all(pool)
            .await?;
        Ok(rows)
    }

    /// Resolve an asset row by its downstream identifier.
    pub async fn by_downstream_id(pool: &PgPool, asset_id: i32) -> DbResult<Self> {
        let row: Option<Self> = sqlx::query_as("SELECT * FROM asset WHERE asset_id = $1")
            .bind(asset_id)
            .fetch_optional(pool)
            .await?;
        row.ok_or(DbError::NotFound("asset"))
    }

    /// Downstream asset ids of every registered room, for the booking
    /// subscription.
    pub async fn watched_downstream_ids(pool: &PgPool, configuration_id: i64) -> DbResult<Vec<i32>> {
        let rows: Vec<(i32,)> = sqlx::query_as(
            r"
            SELECT asset_id FROM asset
            WHERE configuration_id = $1 AND asset_id IS NOT NULL
            ORDER BY asset_id
            ",
        )
        .bind(configuration_id)
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Load the Exchange sync cookie for one asset.
    pub async fn sync_state(pool: &PgPool, id: i64) -> DbResult<String> {
        let row: Option<(String,)> = sqlx::query_as("SELECT sync_state FROM asset WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        row.map(|(s,)| s).ok_or(DbError::NotFound("asset"))
    }

    /// Persist a new sync cookie. Cookies only ever advance; the
    /// caller persists each page before requesting the next one.
    pub async fn persist_sync_state(pool: &PgPool, id: i64, sync_state: &str) -> DbResult<()> {
        sqlx::query("UPDATE asset SET sync_state = $2 WHERE id = $1")
            .bind(id)
            .bind(sync_state)
            .execute(pool)
            .await?;
        Ok(())
    }
}
