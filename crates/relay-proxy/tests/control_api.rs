//! Exercises the management endpoints over a real socket.

use relay_proxy::{control, ProxyConfig, ProxyServer};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

async fn start_stack(intercept: bool, auto_respond: bool) -> (Arc<ProxyServer>, SocketAddr, SocketAddr) {
    let proxy = Arc::new(ProxyServer::new(ProxyConfig {
        port: 0,
        target_endpoints: vec!["http://127.0.0.1:1".to_string()],
        intercept_enabled: intercept,
        auto_respond,
    }));
    let proxy_addr = proxy.start().unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let control_addr = listener.local_addr().unwrap();
    tokio::spawn(control::ControlApiServer::serve(listener, Arc::clone(&proxy)));

    (proxy, proxy_addr, control_addr)
}

fn http_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn test_health_reports_pending_depth() {
    let (_proxy, _proxy_addr, control_addr) = start_stack(false, false).await;

    let body: serde_json::Value = http_client()
        .get(format!("http://{control_addr}/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["pending"], 0);
}

#[tokio::test]
async fn test_pending_list_and_respond_flow() {
    let (proxy, proxy_addr, control_addr) = start_stack(true, false).await;
    let client = http_client();

    let mut events = proxy.register_observer();
    let held_task = tokio::spawn({
        let client = client.clone();
        async move {
            client
                .get(format!("http://{proxy_addr}/held"))
                .send()
                .await
                .unwrap()
        }
    });

    // Wait for the hold to register before listing.
    assert!(timeout(WAIT, events.recv()).await.unwrap().is_some());
    let ids: serde_json::Value = client
        .get(format!("http://{control_addr}/pending"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let pending = ids["pending"].as_array().unwrap();
    assert_eq!(pending.len(), 1);
    let id = pending[0].as_str().unwrap().to_string();

    let res = client
        .post(format!("http://{control_addr}/pending/{id}/respond"))
        .json(&serde_json::json!({ "statusCode": 418, "body": "teapot" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 200);
    let resolved: serde_json::Value = res.json().await.unwrap();
    assert_eq!(resolved["resolved"], id);

    let held = timeout(WAIT, held_task).await.unwrap().unwrap();
    assert_eq!(held.status().as_u16(), 418);
    assert_eq!(held.text().await.unwrap(), "teapot");

    // Resolving the same id again is a 404.
    let res = client
        .post(format!("http://{control_addr}/pending/{id}/respond"))
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}

#[tokio::test]
async fn test_respond_with_invalid_json_is_400() {
    let (_proxy, _proxy_addr, control_addr) = start_stack(true, false).await;

    let res = http_client()
        .post(format!("http://{control_addr}/pending/some-id/respond"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 400);
}

#[tokio::test]
async fn test_config_read_and_patch() {
    let (proxy, _proxy_addr, control_addr) = start_stack(false, false).await;
    let client = http_client();

    let cfg: serde_json::Value = client
        .get(format!("http://{control_addr}/config"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cfg["interceptEnabled"], false);

    let updated: serde_json::Value = client
        .patch(format!("http://{control_addr}/config"))
        .json(&serde_json::json!({ "interceptEnabled": true, "autoRespond": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["interceptEnabled"], true);
    assert_eq!(updated["autoRespond"], true);
    assert!(proxy.config().intercept_enabled);
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (_proxy, _proxy_addr, control_addr) = start_stack(false, false).await;

    let res = http_client()
        .get(format!("http://{control_addr}/nope"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status().as_u16(), 404);
}
