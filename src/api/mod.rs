//! HTTP API for the pharmacy back office.
//!
//! Routes are nested under `/api/` and, except for the health check, run
//! behind a middleware stack: Identity → Audit → Handler.
//!
//! `pharmacy_api_router()` returns a `Router` that can be mounted on any
//! axum server instance; `server` owns the listener lifecycle.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::pharmacy_api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
