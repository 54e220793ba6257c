//! Control API server.

use super::router::route_request;
use crate::proxy::ProxyServer;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// HTTP surface for manual resolution and runtime configuration.
pub struct ControlApiServer {
    addr: SocketAddr,
    proxy: Arc<ProxyServer>,
}

impl ControlApiServer {
    pub fn new(addr: SocketAddr, proxy: Arc<ProxyServer>) -> Self {
        Self { addr, proxy }
    }

    /// Bind the control port and serve until the task is dropped.
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let listener = TcpListener::bind(self.addr).await?;
        info!("control API listening on http://{}", listener.local_addr()?);
        Self::serve(listener, self.proxy).await
    }

    /// Serve on an already-bound listener (lets tests use ephemeral ports).
    pub async fn serve(listener: TcpListener, proxy: Arc<ProxyServer>) -> Result<(), anyhow::Error> {
        loop {
            let (stream, _) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let proxy = Arc::clone(&proxy);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let proxy = Arc::clone(&proxy);
                    async move { route_request(req, proxy).await }
                });

                if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("control API connection error: {}", e);
                }
            });
        }
    }
}
