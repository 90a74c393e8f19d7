//! Configuration CRUD handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use roomsync_core::Configuration;
use roomsync_db::models::ConfigurationRow;
use serde::Serialize;
use tracing::info;

use crate::error::ApiResult;
use crate::router::ApiState;

/// Version information.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    pub version: &'static str,
}

pub async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn list_configurations(
    State(state): State<ApiState>,
) -> ApiResult<Json<Vec<Configuration>>> {
    let configs = ConfigurationRow::all(&state.pool).await?;
    Ok(Json(configs))
}

pub async fn create_configuration(
    State(state): State<ApiState>,
    Json(config): Json<Configuration>,
) -> ApiResult<(StatusCode, Json<Configuration>)> {
    let created = ConfigurationRow::insert(&state.pool, &config).await?;
    info!(config = ?created.id, "configuration created");
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_configuration(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Configuration>> {
    let config = ConfigurationRow::get(&state.pool, id).await?;
    Ok(Json(config))
}

pub async fn update_configuration(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(config): Json<Configuration>,
) -> ApiResult<Json<Configuration>> {
    let updated = ConfigurationRow::update(&state.pool, id, &config).await?;
    info!(config = id, "configuration updated");
    Ok(Json(updated))
}

pub async fn delete_configuration(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    ConfigurationRow::delete(&state.pool, id).await?;
    info!(config = id, "configuration deleted");
    Ok(StatusCode::NO_CONTENT)
}
