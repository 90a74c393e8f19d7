//! Configuration persistence and conversion to the domain record.

use roomsync_core::{Configuration, FilterRule};
use sqlx::PgPool;

use crate::error::{DbError, DbResult};

/// Database row backing a [`Configuration`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConfigurationRow {
    pub id: i64,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant_id: Option<String>,
    pub ews_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub service_user_upn: String,
    pub room_list_upn: Option<String>,
    pub booking_url: String,
    pub refresh_interval: i32,
    pub request_timeout: i32,
    pub asset_filter: Option<serde_json::Value>,
    pub enable: bool,
    pub active: bool,
    pub project_ids: Vec<String>,
    pub user_id: Option<String>,
}

impl ConfigurationRow {
    /// Convert to the domain configuration record.
    ///
    /// # Errors
    ///
    /// Returns `DbError::Validation` when the stored asset filter is
    /// not a valid rule matrix.
    pub fn into_domain(self) -> DbResult<Configuration> {
        let asset_filter = match self.asset_filter {
            Some(value) => Some(
                serde_json::from_value::<Vec<Vec<FilterRule>>>(value)
                    .map_err(|e| DbError::Validation(format!("invalid asset filter: {e}")))?,
            ),
            None => None,
        };
        Ok(Configuration {
            id: Some(self.id),
            client_id: self.client_id,
            client_secret: self.client_secret,
            tenant_id: self.tenant_id,
            ews_url: self.ews_url,
            username: self.username,
            password: self.password,
            service_user_upn: self.service_user_upn,
            room_list_upn: self.room_list_upn,
            booking_url: self.booking_url,
            refresh_interval: self.refresh_interval,
            request_timeout: self.request_timeout,
            asset_filter,
            enable: self.enable,
            active: self.active,
            project_ids: self.project_ids,
            user_id: self.user_id,
        })
    }

    /// Insert a new configuration and return it with its assigned id.
    pub async fn insert(pool: &PgPool, config: &Configuration) -> DbResult<Configuration> {
        let asset_filter = encode_filter(config)?;
        let row: ConfigurationRow = sqlx::query_as(
            r"
            INSERT INTO configuration (
                client_id, client_secret, tenant_id, ews_url, username, password,
                service_user_upn, room_list_upn, booking_url, refresh_interval,
                request_timeout, asset_filter, enable, active, project_ids, user_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            ",
        )
        .bind(&config.client_id)
        .bind(&config.client_secret)
        .bind(&config.tenant_id)
        .bind(&config.ews_url)
        .bind(&config.username)
        .bind(&config.password)
        .bind(&config.service_user_upn)
        .bind(&config.room_list_upn)
        .bind(&config.booking_url)
        .bind(config.refresh_interval)
        .bind(config.request_timeout)
        .bind(asset_filter)
        .bind(config.enable)
        .bind(config.active)
        .bind(&config.project_ids)
        .bind(&config.user_id)
        .fetch_one(pool)
        .await?;
        row.into_domain()
    }

    /// Update an existing configuration in place.
    pub async fn update(pool: &PgPool, id: i64, config: &Configuration) -> DbResult<Configuration> {
        let asset_filter = encode_filter(config)?;
        let row: Option<ConfigurationRow> = sqlx::query_as(
            r"
            UPDATE configuration SET
                client_id = $2, client_secret = $3, tenant_id = $4, ews_url = $5,
                username = $6, password = $7, service_user_upn = $8, room_list_upn = $9,
                booking_url = $10, refresh_interval = $11, request_timeout = $12,
                asset_filter = $13, enable = $14, project_ids = $15, user_id = $16
            WHERE id = $1
            RETURNING *
            ",
        )
        .bind(id)
        .bind(&config.client_id)
        .bind(&config.client_secret)
        .bind(&config.tenant_id)
        .bind(&config.ews_url)
        .bind(&config.username)
        .bind(&config.password)
        .bind(&config.service_user_upn)
        .bind(&config.room_list_upn)
        .bind(&config.booking_url)
        .bind(config.refresh_interval)
        .bind(config.request_timeout)
        .bind(asset_filter)
        .bind(config.enable)
        .bind(&config.project_ids)
        .bind(&config.user_id)
        .fetch_optional(pool)
        .await?;
        row.ok_or(DbError::NotFound("configuration"))?.into_domain()
    }

    /// Fetch one configuration by id.
    pub async fn get(pool: &PgPool, id: i64) -> DbResult<Configuration> {
        let row: Option<ConfigurationRow> =
            sqlx::query_as("SELECT * FROM configuration WHERE id = $1")
                .bind(id)
                .fetch_optional(pool)
                .await?;
        row.ok_or(DbError::NotFound("configuration"))?.into_domain()
    }

    /// Fetch all configurations.
    pub async fn all(pool: &PgPool) -> DbResult<Vec<Configuration>> {
        let rows: Vec<ConfigurationRow> = sqlx::query_as("SELECT * FROM configuration ORDER BY id")
            .fetch_all(pool)
            .await?;
        rows.into_iter().map(ConfigurationRow::into_domain).collect()
    }

    /// Delete a configuration. Assets and the identity graph rows
    /// hanging off them are removed by the cascade.
    pub async fn delete(pool: &PgPool, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM configuration WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound("configuration"));
        }
        Ok(())
    }

    /// Flip the active flag recorded for a configuration.
    pub async fn set_active(pool: &PgPool, id: i64, active: bool) -> DbResult<()> {
        sqlx::query("UPDATE configuration SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(pool)
            .await?;
        Ok(())
    }
}

fn encode_filter(config: &Configuration) -> DbResult<Option<serde_json::Value>> {
    config
        .asset_filter
        .as_ref()
        .map(|f| {
            serde_json::to_value(f)
                .map_err(|e| DbError::Validation(format!("unencodable asset filter: {e}")))
        })
        .transpose()
}
