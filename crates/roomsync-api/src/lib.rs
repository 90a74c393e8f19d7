//! Configuration REST API.
//!
//! CRUD over configuration records plus a version endpoint. The
//! orchestrator re-reads configurations on its next supervision tick;
//! no push channel is needed.

mod error;
mod handlers;
mod router;

pub use error::{ApiError, ApiResult};
pub use router::{router, ApiState};
