//! Axum router for the configuration API.

use axum::routing::get;
use axum::Router;
use sqlx::PgPool;

use crate::handlers;

/// Shared state for the API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub pool: PgPool,
}

/// Build the API router.
pub fn router(pool: PgPool) -> Router {
    Router::new()
        .route("/version", get(handlers::version))
        .route(
            "/configs",
            get(handlers::list_configurations).post(handlers::create_configuration),
        )
        .route(
            "/configs/:id",
            get(handlers::get_configuration)
                .put(handlers::update_configuration)
                .delete(handlers::delete_configuration),
        )
        .with_state(ApiState { pool })
}
