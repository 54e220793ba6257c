//! Request forwarding to the target endpoint.
//!
//! The forwarder always selects the first configured target endpoint.
//! Bodies are fully buffered in both directions; a transport-level failure
//! against the upstream short-circuits to the fixed gateway-failure reply
//! and is never retried.

use super::client::HttpClient;
use crate::capture::{headers_to_map, InterceptedResponse, SubstituteResponse};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Method, Request, Response, StatusCode};
use std::time::Instant;
use tracing::{debug, warn};

/// Exact body text of the synthesized gateway-failure reply.
pub const BAD_GATEWAY_BODY: &str = "Bad Gateway: Unable to reach target server";

/// Synthesized reply for an unreachable upstream.
pub fn bad_gateway() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::BAD_GATEWAY)
        .header("content-type", "text/plain")
        .body(Full::new(Bytes::from_static(BAD_GATEWAY_BODY.as_bytes())))
        .expect("static 502 response must build")
}

/// Build the wire reply for a manually supplied substitute.
/// Missing status defaults to 200; malformed header entries are skipped.
pub fn substitute_to_response(substitute: &SubstituteResponse) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(substitute.status_code.unwrap_or(200)).unwrap_or(StatusCode::OK);

    let mut response = Response::builder().status(status);
    if let Some(headers) = &substitute.headers {
        for (name, value) in headers {
            if let (Ok(name), Ok(value)) = (
                name.parse::<HeaderName>(),
                HeaderValue::from_str(value),
            ) {
                response = response.header(name, value);
            }
        }
    }

    let body = substitute.body.clone().unwrap_or_default();
    response
        .body(Full::new(Bytes::from(body)))
        .unwrap_or_else(|_| bad_gateway())
}

/// Result of an upstream exchange: the reply to write back to the caller,
/// plus the captured record when the exchange succeeded. `None` on the
/// failure path, where only the caller sees the 502.
pub struct ForwardOutcome {
    pub response: Response<Full<Bytes>>,
    pub record: Option<InterceptedResponse>,
}

/// Forward a captured request to the target and buffer the reply.
///
/// The outbound request carries the same method, path+query, headers minus
/// `Host`, and body. `captured_at` anchors the response-time measurement to
/// capture time, not forward time.
pub async fn forward_upstream(
    http_client: &HttpClient,
    request_id: &str,
    method: Method,
    url: &str,
    headers: &HeaderMap,
    body: Bytes,
    target: &str,
    captured_at: Instant,
) -> ForwardOutcome {
    let full_uri = format!("{}{}", target.trim_end_matches('/'), url);
    debug!(request_id, "forwarding to {}", full_uri);

    let mut upstream_req = Request::builder().method(method).uri(&full_uri);

    // Copy headers, skipping host to avoid mismatched virtual-host routing
    for (key, value) in headers.iter() {
        if key != "host" {
            upstream_req = upstream_req.header(key, value);
        }
    }

    let upstream_req = match upstream_req.body(Full::new(body)) {
        Ok(req) => req,
        Err(e) => {
            warn!(request_id, "failed to build upstream request: {}", e);
            return ForwardOutcome {
                response: bad_gateway(),
                record: None,
            };
        }
    };

    let upstream_response = match http_client.request(upstream_req).await {
        Ok(response) => response,
        Err(e) => {
            warn!(request_id, "upstream unreachable ({}): {}", full_uri, e);
            return ForwardOutcome {
                response: bad_gateway(),
                record: None,
            };
        }
    };

    let (parts, body) = upstream_response.into_parts();
    let body_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(request_id, "failed to read upstream response body: {}", e);
            return ForwardOutcome {
                response: bad_gateway(),
                record: None,
            };
        }
    };

    let response_time = captured_at.elapsed().as_millis() as u64;
    let record = InterceptedResponse::new(
        request_id,
        parts.status.as_u16(),
        parts
            .status
            .canonical_reason()
            .unwrap_or_default()
            .to_string(),
        headers_to_map(&parts.headers),
        &body_bytes,
        response_time,
    );

    debug!(
        request_id,
        "upstream replied {} in {}ms ({} bytes)",
        parts.status,
        response_time,
        record.size
    );

    ForwardOutcome {
        response: Response::from_parts(parts, Full::new(body_bytes)),
        record: Some(record),
    }
}
