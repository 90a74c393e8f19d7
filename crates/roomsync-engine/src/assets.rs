//! Room discovery and the Asset service seam.

use std::collections::HashMap;

use async_trait::async_trait;
use roomsync_booking::{AssetClient, CreateAssetRequest};
use roomsync_core::{matches_filter, Configuration, Room};
use roomsync_db::models::Asset;
use roomsync_ews::EwsClient;
use sqlx::PgPool;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, EngineResult};

/// Downstream directory that assigns asset ids to rooms, accepts the
/// bookable flag and notifies users.
#[async_trait]
pub trait AssetDirectory: Send + Sync {
    /// Register a room in a project and return its downstream id.
    async fn register_room(
        &self,
        config: &Configuration,
        project_id: &str,
        room: &Room,
    ) -> EngineResult<i32>;

    /// Mark a registered asset bookable via the data-push interface.
    async fn mark_bookable(&self, asset_id: i32) -> EngineResult<()>;

    /// Tell the configuring user how many rooms were registered.
    async fn notify_user(&self, config: &Configuration, created: usize) -> EngineResult<()>;
}

/// [`AssetDirectory`] backed by the Asset service HTTP API.
pub struct HttpAssetDirectory {
    client: AssetClient,
}

impl HttpAssetDirectory {
    #[must_use]
    pub fn new(client: AssetClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetDirectory for HttpAssetDirectory {
    async fn register_room(
        &self,
        _config: &Configuration,
        project_id: &str,
        room: &Room,
    ) -> EngineResult<i32> {
        let id = self
            .client
            .create_asset(&CreateAssetRequest {
                name: room.name.clone(),
                email: room.email.clone(),
                project_id: project_id.to_string(),
                global_asset_id: room.global_asset_id(),
            })
            .await?;
        Ok(id)
    }

    async fn mark_bookable(&self, asset_id: i32) -> EngineResult<()> {
        self.client.mark_bookable(asset_id).await?;
        Ok(())
    }

    async fn notify_user(&self, config: &Configuration, created: usize) -> EngineResult<()> {
        let Some(user_id) = config.user_id.as_deref() else {
            warn!(config = ?config.id, "no user recorded on configuration; skipping notification");
            return Ok(());
        };
        for project_id in &config.project_ids {
            self.client.notify_user(user_id, project_id, created).await?;
        }
        Ok(())
    }
}

/// Diff the configured room list against the store and register every
/// new room downstream. Returns how many assets were created.
pub async fn discover_rooms(
    pool: &PgPool,
    config: &Configuration,
    ews: &EwsClient,
    directory: &dyn AssetDirectory,
) -> EngineResult<usize> {
    let Some(room_list) = config.room_list() else {
        return Ok(0);
    };
    let config_id = config.id.ok_or(EngineError::UnsavedConfiguration)?;
    let filter = config.asset_filter.as_deref().unwrap_or(&[]);

    let rooms = ews.get_rooms(room_list).await?;
    debug!(config = config_id, rooms = rooms.len(), "room list fetched");

    let mut created = 0;
    for room in rooms {
        let fields = HashMap::from([
            ("email".to_string(), room.email.clone()),
            ("name".to_string(), room.name.clone()),
        ]);
        if !matches_filter(filter, &fields)? {
            debug!(room = %room.email, "room excluded by asset filter");
            continue;
        }

        for project_id in &config.project_ids {
            let existing =
                Asset::find(pool, config_id, project_id, &room.global_asset_id()).await?;
            if existing.is_some() {
                continue;
            }
            let downstream_id = directory.register_room(config, project_id, &room).await?;
            Asset::insert(
                pool,
                config_id,
                project_id,
                &room.global_asset_id(),
                &room.email,
                downstream_id,
            )
            .await?;
            info!(
                config = config_id,
                room = %room.email,
                asset = downstream_id,
                "room registered"
            );
            created += 1;
        }
    }

    if created > 0 {
        // Best effort; a failed notification never fails the pass.
        if let Err(e) = directory.notify_user(config, created).await {
            error!(config = config_id, error = %e, "notifying user about new rooms");
        }
    }
    Ok(created)
}

/// Mark every registered room of a configuration bookable.
pub async fn mark_all_bookable(
    pool: &PgPool,
    config_id: i64,
    directory: &dyn AssetDirectory,
) -> EngineResult<()> {
    for asset_id in Asset::watched_downstream_ids(pool, config_id).await? {
        directory.mark_bookable(asset_id).await?;
    }
    Ok(())
}
