//! Relay proxy: an intercepting local HTTP proxy for API debugging.
//!
//! The proxy sits between a client application and an upstream target,
//! captures every request, optionally holds it for a manual operator
//! decision, forwards it (or substitutes a fabricated reply), and reports
//! both sides of the exchange to a registered observer.

pub mod capture;
pub mod config;
pub mod control;
pub mod error;
pub mod events;
pub mod pending;
pub mod proxy;

pub use capture::{InterceptedRequest, InterceptedResponse, SubstituteResponse};
pub use config::{ConfigUpdate, ProxyConfig};
pub use control::ControlApiServer;
pub use error::ProxyError;
pub use events::ProxyEvent;
pub use proxy::ProxyServer;
