//! Error types for the proxy library.

use std::net::SocketAddr;
use thiserror::Error;

/// Failures surfaced by the proxy lifecycle.
///
/// Upstream connect failures are deliberately absent: the forwarder recovers
/// from them locally by synthesizing a 502 reply, so they never propagate as
/// a process-level fault. An unknown id passed to `respond` is a logged
/// no-op, not an error.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The listener could not bind its configured port.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Configuration rejected by validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
