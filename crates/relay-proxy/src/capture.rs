//! Captured request/response records and capture-time parsing.
//!
//! An [`InterceptedRequest`] is built once per inbound connection, after the
//! full body has been buffered, and never mutated afterwards. The matching
//! [`InterceptedResponse`] is built either by the forwarder from the
//! upstream reply or by manual resolution from a supplied substitute.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use hyper::HeaderMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A fully captured inbound request. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedRequest {
    /// Correlation id, unique for the lifetime of the process.
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub method: String,
    /// Path plus raw query, exactly as received.
    pub url: String,
    pub headers: HashMap<String, String>,
    /// Body decoded as text; absent when empty. Binary payloads come through
    /// lossily; an accepted limitation, not a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub query_params: HashMap<String, String>,
    pub client_address: String,
    pub protocol: String,
}

/// The reply that completed a captured request. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedResponse {
    /// Derived id: `<requestId>-response`.
    pub id: String,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub status_code: u16,
    pub status_text: String,
    pub headers: HashMap<String, String>,
    pub body: String,
    /// Milliseconds elapsed since the request was captured.
    pub response_time: u64,
    /// Byte length of the body, falling back to the header-declared length.
    pub size: u64,
}

impl InterceptedResponse {
    pub fn new(
        request_id: &str,
        status_code: u16,
        status_text: String,
        headers: HashMap<String, String>,
        body: &Bytes,
        response_time: u64,
    ) -> Self {
        let size = if body.is_empty() {
            headers
                .get("content-length")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0)
        } else {
            body.len() as u64
        };

        Self {
            id: format!("{request_id}-response"),
            request_id: request_id.to_string(),
            timestamp: Utc::now(),
            status_code,
            status_text,
            headers,
            body: String::from_utf8_lossy(body).to_string(),
            response_time,
            size,
        }
    }
}

/// Operator-supplied reply for a held request. All fields optional; the
/// status defaults to 200 when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubstituteResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// Generate a correlation id: epoch milliseconds plus a short random suffix.
/// Practically unique per process, not cryptographically unique.
pub fn generate_request_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(7)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!("{}-{}", Utc::now().timestamp_millis(), suffix)
}

/// Parse a raw query string into decoded key/value pairs.
///
/// Pairs split on the first `=`; a pair without `=` yields an empty-string
/// value. Both sides are percent-decoded, with the raw text kept on decode
/// failure.
pub fn parse_query_string(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(q) = query {
        for pair in q.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                params.insert(decode_component(key), decode_component(value));
            } else if !pair.is_empty() {
                params.insert(decode_component(pair), String::new());
            }
        }
    }
    params
}

fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|c| c.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// Flatten a hyper header map into string pairs. Header names arrive
/// lowercased from the HTTP layer; values are kept byte-for-byte where they
/// are valid UTF-8.
pub fn headers_to_map(headers: &HeaderMap) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for (name, value) in headers.iter() {
        if let Ok(v) = value.to_str() {
            map.insert(name.as_str().to_string(), v.to_string());
        }
    }
    map
}

/// Build the immutable capture record for an inbound request.
pub fn capture_request(
    method: &hyper::Method,
    uri: &hyper::Uri,
    headers: &HeaderMap,
    body: &Bytes,
    client_address: std::net::SocketAddr,
) -> InterceptedRequest {
    let url = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let body_text = if body.is_empty() {
        None
    } else {
        Some(String::from_utf8_lossy(body).to_string())
    };

    InterceptedRequest {
        id: generate_request_id(),
        timestamp: Utc::now(),
        method: method.to_string(),
        url,
        headers: headers_to_map(headers),
        body: body_text,
        query_params: parse_query_string(uri.query()),
        client_address: client_address.to_string(),
        protocol: "http".to_string(),
    }
}
