//! Task supervision: one collector loop and one subscription loop per
//! enabled configuration.

use std::sync::Arc;
use std::time::Duration;

use roomsync_core::Configuration;
use roomsync_db::models::ConfigurationRow;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::assets::AssetDirectory;
use crate::registry::TaskRegistry;
use crate::trigger::{resubscribe_channel, ResubscribeListener, ResubscribeTrigger};
use crate::{collector, exchange_lock, writer, ExchangeLock};

/// How often the supervisor re-reads the configurations and ensures
/// their tasks are alive.
const SUPERVISOR_INTERVAL: Duration = Duration::from_secs(10);

/// Supervises the per-configuration task pairs.
pub struct Orchestrator {
    pool: PgPool,
    directory: Arc<dyn AssetDirectory>,
    exchange: ExchangeLock,
    resubscribe: ResubscribeTrigger,
    listener: ResubscribeListener,
    registry: TaskRegistry,
    logged_empty: bool,
}

impl Orchestrator {
    #[must_use]
    pub fn new(pool: PgPool, directory: Arc<dyn AssetDirectory>) -> Self {
        let (resubscribe, listener) = resubscribe_channel();
        Self {
            pool,
            directory,
            exchange: exchange_lock(),
            resubscribe,
            listener,
            registry: TaskRegistry::new(),
            logged_empty: false,
        }
    }

    /// Run until `shutdown` is cancelled.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut interval = tokio::time::interval(SUPERVISOR_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = shutdown.cancelled() => {
                    info!("orchestrator shutting down");
                    self.registry.abort_all();
                    break;
                }
                _ = interval.tick() => self.tick(&shutdown).await,
            }
        }
    }

    async fn tick(&mut self, shutdown: &CancellationToken) {
        let configs = match ConfigurationRow::all(&self.pool).await {
            Ok(configs) => configs,
            Err(e) => {
                error!(error = %e, "reading configurations");
                return;
            }
        };

        if configs.is_empty() {
            if !self.logged_empty {
                info!("No configurations in the database yet. Configure the app via the REST API.");
                self.logged_empty = true;
            }
            return;
        }

        for config in configs {
            let Some(config_id) = config.id else { continue };

            if !config.enable {
                if config.active {
                    self.set_active(config_id, false).await;
                }
                continue;
            }
            if let Err(e) = config.credentials() {
                error!(config = config_id, error = %e, "rejecting configuration");
                continue;
            }
            if !config.active {
                self.set_active(config_id, true).await;
                info!(
                    config = config_id,
                    refresh_interval = config.refresh_interval,
                    request_timeout = config.request_timeout,
                    projects = ?config.project_ids,
                    "configuration activated"
                );
            }

            self.ensure_subscription(config_id, config.clone(), shutdown);
            self.ensure_collection(config_id, config, shutdown);
        }
    }

    async fn set_active(&self, config_id: i64, active: bool) {
        if let Err(e) = ConfigurationRow::set_active(&self.pool, config_id, active).await {
            error!(config = config_id, error = %e, "updating active flag");
        }
    }

    /// One collector pass plus the refresh sleep; the supervisor
    /// re-spawns the task on its next tick, so a disabled
    /// configuration stops at this boundary.
    fn ensure_collection(
        &mut self,
        config_id: i64,
        config: Configuration,
        shutdown: &CancellationToken,
    ) {
        let pool = self.pool.clone();
        let exchange = self.exchange.clone();
        let directory = self.directory.clone();
        let resubscribe = self.resubscribe.clone();
        let shutdown = shutdown.clone();
        let refresh = Duration::from_secs(config.refresh_interval.max(1) as u64);

        self.registry
            .spawn_once(&format!("collection_{config_id}"), async move {
                info!(config = config_id, "collection started");
                match collector::collect(
                    &pool,
                    &config,
                    &exchange,
                    directory.as_ref(),
                    &resubscribe,
                )
                .await
                {
                    Ok(()) => info!(config = config_id, "collection finished"),
                    Err(e) => error!(config = config_id, error = %e, "collection failed"),
                }
                tokio::select! {
                    () = shutdown.cancelled() => {}
                    () = tokio::time::sleep(refresh) => {}
                }
            });
    }

    /// One subscription session. The session context is cancelled by
    /// a re-subscribe trigger or by shutdown; the supervisor then
    /// re-spawns the session with the refreshed asset set.
    fn ensure_subscription(
        &mut self,
        config_id: i64,
        config: Configuration,
        shutdown: &CancellationToken,
    ) {
        let pool = self.pool.clone();
        let exchange = self.exchange.clone();
        let listener = self.listener.clone();
        let shutdown = shutdown.clone();

        self.registry
            .spawn_once(&format!("subscription_{config_id}"), async move {
                info!(config = config_id, "subscription started");

                let session = shutdown.child_token();
                let watcher = {
                    let session = session.clone();
                    tokio::spawn(async move {
                        listener.wait().await;
                        info!("resubscription triggered");
                        session.cancel();
                    })
                };

                if let Err(e) = writer::run_subscription(&pool, &config, &exchange, session).await {
                    error!(config = config_id, error = %e, "subscription failed");
                }
                watcher.abort();

                info!(config = config_id, "subscription exited; resubscribing");
            });
    }
}
