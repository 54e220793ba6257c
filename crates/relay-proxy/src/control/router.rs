//! Route dispatch for the control API.
//!
//! Hand-rolled method+path dispatch; the surface is small enough that a
//! routing framework would be overhead.

use super::types::{
    error_response, json_response, not_found, HealthResponse, PendingListResponse,
    ResolvedResponse,
};
use crate::capture::SubstituteResponse;
use crate::config::ConfigUpdate;
use crate::proxy::ProxyServer;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;
use tracing::debug;

/// Main request router for the control API.
pub async fn route_request(
    req: Request<Incoming>,
    proxy: Arc<ProxyServer>,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("control API: {} {}", method, path);

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/health") => json_response(
            StatusCode::OK,
            &HealthResponse {
                status: "ok",
                pending: proxy.pending_count(),
            },
        ),
        (&Method::GET, "/config") => json_response(StatusCode::OK, &proxy.config()),
        (&Method::PATCH, "/config") => handle_config_update(req, proxy).await,
        (&Method::GET, "/pending") => json_response(
            StatusCode::OK,
            &PendingListResponse {
                pending: proxy.pending_ids(),
            },
        ),
        _ => {
            if let Some(rest) = path.strip_prefix("/pending/") {
                route_pending(&method, rest, req, proxy).await
            } else {
                not_found()
            }
        }
    };

    Ok(response)
}

/// Routes under `/pending/:id/...`
async fn route_pending(
    method: &Method,
    path: &str,
    req: Request<Incoming>,
    proxy: Arc<ProxyServer>,
) -> Response<Full<Bytes>> {
    let segments: Vec<&str> = path.split('/').collect();
    match (method, segments.as_slice()) {
        (&Method::POST, [id, "respond"]) if !id.is_empty() => {
            handle_respond(id.to_string(), req, proxy).await
        }
        _ => not_found(),
    }
}

/// POST /pending/:id/respond: resolve a held request with a substitute
/// reply. An unknown id maps to 404; proxy-side it is a no-op.
async fn handle_respond(
    id: String,
    req: Request<Incoming>,
    proxy: Arc<ProxyServer>,
) -> Response<Full<Bytes>> {
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "failed to read request body"),
    };

    let substitute: SubstituteResponse = if body.is_empty() {
        SubstituteResponse::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(sub) => sub,
            Err(e) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    &format!("invalid substitute response: {e}"),
                )
            }
        }
    };

    if proxy.respond(&id, substitute) {
        json_response(StatusCode::OK, &ResolvedResponse { resolved: id })
    } else {
        error_response(StatusCode::NOT_FOUND, "no pending request with that id")
    }
}

/// PATCH /config: merge a partial update into the live configuration.
async fn handle_config_update(
    req: Request<Incoming>,
    proxy: Arc<ProxyServer>,
) -> Response<Full<Bytes>> {
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "failed to read request body"),
    };

    let update: ConfigUpdate = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("invalid config update: {e}"))
        }
    };

    let updated = proxy.update_config(update);
    json_response(StatusCode::OK, &updated)
}
