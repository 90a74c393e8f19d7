//! roomsync: bidirectional room-reservation sync between a Microsoft
//! Exchange backend (EWS) and a downstream Booking service.
//!
//! The binary wires the pieces together: database pool and
//! migrations, the orchestrator driving the per-configuration sync
//! tasks, and the configuration REST API.

mod config;
mod logging;

use std::net::SocketAddr;
use std::sync::Arc;

use config::Config;
use roomsync_booking::AssetClient;
use roomsync_db::{run_migrations, DbPool};
use roomsync_engine::{HttpAssetDirectory, Orchestrator};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    logging::init_logging(&config.rust_log);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        port = config.port,
        "Starting roomsync"
    );

    let pool = match DbPool::connect(&config.database_url).await {
        Ok(pool) => {
            info!("Database connection established");
            pool
        }
        Err(e) => {
            eprintln!("Failed to connect to database: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_migrations(pool.inner()).await {
        eprintln!("FATAL: database migration failed: {e}");
        std::process::exit(1);
    }

    let directory = match AssetClient::new(config.asset_service_url.clone()) {
        Ok(client) => Arc::new(HttpAssetDirectory::new(client)),
        Err(e) => {
            eprintln!("Failed to create asset service client: {e}");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let orchestrator = Orchestrator::new(pool.inner().clone(), directory);
    let orchestrator_handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { orchestrator.run(shutdown).await })
    };

    let app = roomsync_api::router(pool.inner().clone()).layer(CorsLayer::permissive());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    info!(%addr, "API server listening");

    let server_shutdown = shutdown.clone();
    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        server_shutdown.cancelled().await;
    });

    tokio::select! {
        result = async { server.await } => {
            if let Err(e) = result {
                tracing::error!(error = %e, "API server failed");
            }
        }
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    shutdown.cancel();
    let _ = orchestrator_handle.await;
    pool.close().await;
    info!("roomsync stopped");
}
