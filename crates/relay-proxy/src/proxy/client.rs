//! Outbound HTTP client creation.
//!
//! One shared client with connection pooling serves every forwarded
//! request. The connector speaks both plain and TLS transports and picks
//! between them from the target URL's scheme.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tracing::debug;

/// Type alias for the HTTP client used by the forwarder.
pub type HttpClient = Client<
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>,
    Full<Bytes>,
>;

const CONNECT_TIMEOUT_SECS: u64 = 10;
const POOL_IDLE_TIMEOUT_SECS: u64 = 90;
const POOL_MAX_IDLE_PER_HOST: usize = 32;

/// Create the shared outbound client (HTTP/1.1 only).
pub fn create_http_client() -> HttpClient {
    let mut http_connector = hyper_util::client::legacy::connect::HttpConnector::new();
    http_connector.set_connect_timeout(Some(Duration::from_secs(CONNECT_TIMEOUT_SECS)));
    http_connector.enforce_http(false); // Allow both HTTP and HTTPS

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .expect("Failed to load native root certificates")
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    let client = Client::builder(TokioExecutor::new())
        .pool_idle_timeout(Duration::from_secs(POOL_IDLE_TIMEOUT_SECS))
        .pool_max_idle_per_host(POOL_MAX_IDLE_PER_HOST)
        .build(https_connector);

    debug!(
        "Outbound client ready (HTTP/1.1): max_idle={}, idle_timeout={}s, connect_timeout={}s",
        POOL_MAX_IDLE_PER_HOST, POOL_IDLE_TIMEOUT_SECS, CONNECT_TIMEOUT_SECS
    );

    client
}
