//! Identity store for roomsync.
//!
//! Persists configurations, room assets and the cross-system identity
//! graph (booking group ↔ occurrence ↔ per-room event), plus the
//! per-asset Exchange sync cookie. All lookups the engine relies on
//! for correctness live here; writes that span the graph run in a
//! single transaction.

mod error;
mod migrations;
pub mod models;
mod pool;
mod store;

pub use error::{DbError, DbResult};
pub use migrations::run_migrations;
pub use pool::{DbPool, DbPoolOptions};
pub use store::{upsert_group_tree, GroupTree, OccurrenceNode, RoomBookingNode};
