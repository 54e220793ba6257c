//! Control API for the proxy: manual resolution of held requests, live
//! configuration, and pending-state inspection.
//!
//! # Endpoints
//!
//! - `GET  /health`: liveness plus held-request count
//! - `GET  /config`: current configuration snapshot
//! - `PATCH /config`: merge a partial update
//! - `GET  /pending`: ids of currently held requests
//! - `POST /pending/:id/respond`: resolve a held request with
//!   `{statusCode?, headers?, body?}`

mod router;
mod server;
mod types;

pub use server::ControlApiServer;
