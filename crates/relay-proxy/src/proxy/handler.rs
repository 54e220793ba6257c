//! Per-request pipeline: capture, decision gate, hold or forward.

use super::client::HttpClient;
use super::forwarding::{bad_gateway, forward_upstream, substitute_to_response};
use crate::capture::capture_request;
use crate::config::ConfigStore;
use crate::events::{EventBus, ProxyEvent};
use crate::pending::PendingRegistry;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Shared state handed to every connection task.
#[derive(Clone)]
pub struct ProxyContext {
    pub config: Arc<ConfigStore>,
    pub pending: Arc<PendingRegistry>,
    pub events: Arc<EventBus>,
    pub http_client: HttpClient,
}

/// Handle one inbound request end to end.
///
/// The decision gate evaluates the configuration snapshot taken at capture
/// time; a live config update never affects a request already past this
/// point. The capture event is published exactly once when interception is
/// enabled, in both the hold and the auto-forward branch; with interception
/// disabled the request is forwarded silently.
pub async fn handle_request(
    ctx: &ProxyContext,
    req: Request<hyper::body::Incoming>,
    client_address: SocketAddr,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let captured_at = Instant::now();
    let (parts, body) = req.into_parts();

    // Full inbound body before anything else; no streaming pass-through.
    let body_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("failed to read inbound request body: {}", e);
            return Ok(plain_response(
                StatusCode::BAD_REQUEST,
                "failed to read request body",
            ));
        }
    };

    let captured = capture_request(
        &parts.method,
        &parts.uri,
        &parts.headers,
        &body_bytes,
        client_address,
    );
    debug!(
        id = %captured.id,
        "captured {} {} from {}",
        captured.method,
        captured.url,
        captured.client_address
    );

    let config = ctx.config.snapshot();
    let hold = config.intercept_enabled && !config.auto_respond;

    if hold {
        // Register before publishing so an observer reacting to the event
        // always finds the pending entry.
        let receiver = ctx.pending.register(captured.id.clone());
        ctx.events
            .publish(ProxyEvent::RequestCaptured(captured.clone()));
        info!(id = %captured.id, "holding {} {} for manual resolution", captured.method, captured.url);

        // No timeout: a held request waits until resolved.
        return match receiver.await {
            Ok(substitute) => {
                info!(id = %captured.id, "resolved manually with status {}",
                    substitute.status_code.unwrap_or(200));
                Ok(substitute_to_response(&substitute))
            }
            Err(_) => {
                // Registry torn down while held; nothing can resolve this
                // request anymore. Answer rather than hang the caller.
                warn!(id = %captured.id, "hold abandoned; replying with gateway failure");
                ctx.pending.discard(&captured.id);
                Ok(bad_gateway())
            }
        };
    }

    if config.intercept_enabled {
        ctx.events
            .publish(ProxyEvent::RequestCaptured(captured.clone()));
    }

    let target = match config.primary_target() {
        Some(target) => target.to_string(),
        None => {
            warn!(id = %captured.id, "no target endpoint configured");
            return Ok(bad_gateway());
        }
    };

    let outcome = forward_upstream(
        &ctx.http_client,
        &captured.id,
        parts.method,
        &captured.url,
        &parts.headers,
        body_bytes,
        &target,
        captured_at,
    )
    .await;

    if let Some(record) = outcome.record {
        ctx.events.publish(ProxyEvent::ResponseReady {
            request: captured,
            response: record,
        });
    }

    Ok(outcome.response)
}

fn plain_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("content-type", "text/plain")
        .body(Full::new(Bytes::from(message.to_string())))
        .expect("static response must build")
}
