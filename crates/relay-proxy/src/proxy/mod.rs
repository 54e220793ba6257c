//! Proxy server module.
//!
//! # Module Structure
//!
//! - `server` - ProxyServer struct, lifecycle, accept loop
//! - `handler` - Per-request capture / decision gate / hold-or-forward
//! - `forwarding` - Upstream forwarding and the synthesized 502 reply
//! - `client` - Outbound HTTP client creation

mod client;
mod forwarding;
mod handler;
mod server;

pub use forwarding::{bad_gateway, substitute_to_response, BAD_GATEWAY_BODY};
pub use server::ProxyServer;
