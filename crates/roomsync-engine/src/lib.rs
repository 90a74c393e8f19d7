//! The sync engine.
//!
//! Three cooperating parts per configuration: the collector pulls
//! incremental calendar changes out of Exchange and pushes them to
//! the Booking service; the writer consumes the Booking change stream
//! and writes into Exchange on behalf of organizers; the orchestrator
//! keeps one collector loop and one subscription loop alive per
//! enabled configuration. A single process-wide Exchange lock
//! serializes every Exchange request across both directions, so a
//! collector pass never observes a write the writer has not yet
//! recorded in the identity store.

pub mod assets;
pub mod collector;
mod error;
pub mod orchestrator;
mod registry;
mod trigger;
pub mod writer;

use std::sync::Arc;

pub use assets::{AssetDirectory, HttpAssetDirectory};
pub use error::{EngineError, EngineResult};
pub use orchestrator::Orchestrator;
pub use registry::TaskRegistry;
pub use trigger::{resubscribe_channel, ResubscribeListener, ResubscribeTrigger};

/// The process-wide lock serializing Exchange access.
pub type ExchangeLock = Arc<tokio::sync::Mutex<()>>;

/// Create the Exchange lock.
#[must_use]
pub fn exchange_lock() -> ExchangeLock {
    Arc::new(tokio::sync::Mutex::new(()))
}
