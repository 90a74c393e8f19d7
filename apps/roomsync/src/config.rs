//! Process configuration from environment variables.

/// Settings the binary needs before it can reach the database.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Listen port of the configuration API.
    pub port: u16,
    /// Base URL of the downstream Asset service.
    pub asset_service_url: String,
    /// Default log filter when RUST_LOG is unset.
    pub rust_log: String,
}

impl Config {
    /// Load the configuration, failing fast on missing required
    /// values.
    pub fn from_env() -> Result<Self, String> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set".to_string())?;
        let asset_service_url = std::env::var("ASSET_SERVICE_URL")
            .map_err(|_| "ASSET_SERVICE_URL must be set".to_string())?;
        let port = match std::env::var("API_SERVER_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| format!("API_SERVER_PORT is not a port number: {raw}"))?,
            Err(_) => 3000,
        };
        let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            port,
            asset_service_url,
            rust_log,
        })
    }
}
