//! ProxyServer struct and accept loop.
//!
//! The server owns the shared state (config store, pending registry, event
//! bus, outbound client) and exposes the lifecycle surface: `start()` binds
//! the configured port and spawns the accept loop, `stop()` closes the
//! listener. Neither drains in-flight forwards nor resolves held requests.

use super::client::{create_http_client, HttpClient};
use super::handler::{handle_request, ProxyContext};
use crate::capture::SubstituteResponse;
use crate::config::{ConfigStore, ConfigUpdate, ProxyConfig};
use crate::error::ProxyError;
use crate::events::{EventBus, ProxyEvent};
use crate::pending::PendingRegistry;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

struct ListenerHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
}

/// The intercepting proxy instance.
pub struct ProxyServer {
    config: Arc<ConfigStore>,
    pending: Arc<PendingRegistry>,
    events: Arc<EventBus>,
    http_client: HttpClient,
    listener: Mutex<Option<ListenerHandle>>,
}

impl ProxyServer {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config: Arc::new(ConfigStore::new(config)),
            pending: Arc::new(PendingRegistry::new()),
            events: Arc::new(EventBus::new()),
            http_client: create_http_client(),
            listener: Mutex::new(None),
        }
    }

    /// Bind the configured port and start accepting connections.
    ///
    /// Returns the bound address (useful with port 0). Calling `start` on a
    /// running proxy is a no-op returning the existing address. Must be
    /// called from within a tokio runtime.
    pub fn start(&self) -> Result<SocketAddr, ProxyError> {
        let mut lifecycle = self.listener.lock();
        if let Some(handle) = lifecycle.as_ref() {
            debug!("start() on running proxy; already listening on {}", handle.local_addr);
            return Ok(handle.local_addr);
        }

        let config = self.config.snapshot();
        config.validate()?;

        let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
        let std_listener = std::net::TcpListener::bind(addr)
            .map_err(|source| ProxyError::Bind { addr, source })?;
        std_listener
            .set_nonblocking(true)
            .map_err(|source| ProxyError::Bind { addr, source })?;
        let listener = TcpListener::from_std(std_listener)
            .map_err(|source| ProxyError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ProxyError::Bind { addr, source })?;

        info!("proxy listening on http://{}", local_addr);
        if let Some(target) = config.primary_target() {
            info!("forwarding to {}", target);
        }
        if config.target_endpoints.len() > 1 {
            info!(
                "{} additional target endpoints configured but unused (no failover)",
                config.target_endpoints.len() - 1
            );
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let ctx = ProxyContext {
            config: Arc::clone(&self.config),
            pending: Arc::clone(&self.pending),
            events: Arc::clone(&self.events),
            http_client: self.http_client.clone(),
        };
        tokio::spawn(accept_loop(listener, ctx, shutdown_rx));

        *lifecycle = Some(ListenerHandle {
            local_addr,
            shutdown: shutdown_tx,
        });
        Ok(local_addr)
    }

    /// Close the listening socket. Work already handed off keeps running;
    /// held requests stay held. Always succeeds if already stopped.
    pub fn stop(&self) {
        if let Some(handle) = self.listener.lock().take() {
            let _ = handle.shutdown.send(());
            info!("proxy listener on {} stopped", handle.local_addr);
        }
    }

    /// Address of the live listener, if running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.lock().as_ref().map(|h| h.local_addr)
    }

    /// Resolve a held request with a substitute reply.
    ///
    /// Returns true if a pending entry existed and the reply was delivered.
    /// An unknown id is a logged no-op: no error, no effect on any
    /// connection.
    pub fn respond(&self, request_id: &str, response: SubstituteResponse) -> bool {
        let resolved = self.pending.resolve(request_id, response);
        if !resolved {
            info!(request_id, "respond() for unknown pending id ignored");
        }
        resolved
    }

    /// Register the single event observer, replacing any previous one.
    pub fn register_observer(&self) -> mpsc::UnboundedReceiver<ProxyEvent> {
        self.events.register()
    }

    /// Merge a partial update into the live configuration. Affects requests
    /// captured after this call only.
    pub fn update_config(&self, update: ConfigUpdate) -> ProxyConfig {
        let updated = self.config.update(update);
        debug!(
            "config updated: intercept={}, autoRespond={}",
            updated.intercept_enabled, updated.auto_respond
        );
        updated
    }

    pub fn config(&self) -> ProxyConfig {
        self.config.snapshot()
    }

    /// Ids of requests currently held for manual resolution.
    pub fn pending_ids(&self) -> Vec<String> {
        self.pending.pending_ids()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

async fn accept_loop(
    listener: TcpListener,
    ctx: ProxyContext,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("accept loop shutting down");
                break;
            }
            accepted = listener.accept() => {
                let (stream, remote_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!("accept failed: {}", e);
                        continue;
                    }
                };

                let ctx = ctx.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    let service = service_fn(move |req| {
                        let ctx = ctx.clone();
                        async move { handle_request(&ctx, req, remote_addr).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        debug!("error serving connection from {}: {}", remote_addr, err);
                    }
                });
            }
        }
    }
}
