//! Database migration management.

use crate::error::DbError;
use sqlx::PgPool;

/// Run all pending database migrations.
///
/// Migrations are embedded at compile time from the `migrations/`
/// directory and run in order based on their filename prefix.
///
/// # Errors
///
/// Returns `DbError::MigrationFailed` if any migration fails to apply.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DbError> {
    tracing::info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(DbError::MigrationFailed)?;

    tracing::info!("Migrations completed");
    Ok(())
}
