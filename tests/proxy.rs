//! End-to-end forwarding through a running gateway.

use api_gateway::config::RouteConfig;
use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn test_prefix_stripped_and_query_preserved() {
    let backend = common::start_echo_backend().await;
    let config = common::config_with_routes(vec![RouteConfig::new("/public", format!("http://{}", backend))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let echoed: Value = common::client()
        .get(format!("http://{}/public/items?x=1", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(echoed["method"], "GET");
    assert_eq!(echoed["path"], "/items");
    assert_eq!(echoed["query"], "x=1");
    shutdown.trigger();
}

#[tokio::test]
async fn test_longest_prefix_wins() {
    let general = common::start_echo_backend().await;
    let versioned = common::start_echo_backend().await;
    let config = common::config_with_routes(vec![
        RouteConfig::new("/api", format!("http://{}", general)).with_change_origin(true),
        RouteConfig::new("/api/v2", format!("http://{}", versioned)).with_change_origin(true),
    ]);
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    let echoed: Value = client
        .get(format!("http://{}/api/v2/users", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(echoed["path"], "/users");
    assert_eq!(echoed["headers"]["host"], versioned.to_string());

    let echoed: Value = client
        .get(format!("http://{}/api/users", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(echoed["path"], "/users");
    assert_eq!(echoed["headers"]["host"], general.to_string());

    // Not segment-aligned with /api.
    let response = client.get(format!("http://{}/apiary", gateway)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    shutdown.trigger();
}

#[tokio::test]
async fn test_host_preserved_without_change_origin() {
    let backend = common::start_echo_backend().await;
    let config = common::config_with_routes(vec![RouteConfig::new("/public", format!("http://{}", backend))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let echoed: Value = common::client()
        .get(format!("http://{}/public/items", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(echoed["headers"]["host"], gateway.to_string());
    shutdown.trigger();
}

#[tokio::test]
async fn test_host_rewritten_with_change_origin() {
    let backend = common::start_echo_backend().await;
    let config = common::config_with_routes(vec![
        RouteConfig::new("/public", format!("http://{}", backend)).with_change_origin(true),
    ]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let echoed: Value = common::client()
        .get(format!("http://{}/public/items", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(echoed["headers"]["host"], backend.to_string());
    shutdown.trigger();
}

#[tokio::test]
async fn test_connection_and_transfer_encoding_not_forwarded() {
    let backend = common::start_echo_backend().await;
    let config = common::config_with_routes(vec![RouteConfig::new("/public", format!("http://{}", backend))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let request = format!(
        "POST /public/upload HTTP/1.1\r\nHost: {}\r\nConnection: close\r\nTransfer-Encoding: chunked\r\nX-Custom: kept\r\n\r\n5\r\nhello\r\n0\r\n\r\n",
        gateway
    );
    let raw = common::raw_request(gateway, &request).await;
    let echoed = common::json_from_raw(&raw);

    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["body"], "hello");
    assert_eq!(echoed["headers"]["x-custom"], "kept");
    assert!(echoed["headers"].get("connection").is_none());
    assert!(echoed["headers"].get("transfer-encoding").is_none());
    shutdown.trigger();
}

#[tokio::test]
async fn test_body_and_request_id_forwarded() {
    let backend = common::start_echo_backend().await;
    let config = common::config_with_routes(vec![RouteConfig::new("/private", format!("http://{}", backend))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let response = common::client()
        .post(format!("http://{}/private/users", gateway))
        .json(&json!({ "name": "ada" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let request_id = response.headers()["x-request-id"].to_str().unwrap().to_string();
    let echoed: Value = response.json().await.unwrap();

    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["headers"]["x-request-id"], request_id);
    assert_eq!(echoed["headers"]["content-type"], "application/json");
    let body: Value = serde_json::from_str(echoed["body"].as_str().unwrap()).unwrap();
    assert_eq!(body, json!({ "name": "ada" }));
    shutdown.trigger();
}

#[tokio::test]
async fn test_path_rewrite_applied() {
    let backend = common::start_echo_backend().await;
    let config = common::config_with_routes(vec![
        RouteConfig::new("/docs", format!("http://{}/api-docs", backend)).with_rewrite("/swagger", "/ui"),
    ]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let echoed: Value = common::client()
        .get(format!("http://{}/docs/swagger/index.html", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(echoed["path"], "/api-docs/ui/index.html");
    shutdown.trigger();
}

#[tokio::test]
async fn test_unmatched_path_is_404() {
    let backend = common::start_echo_backend().await;
    let config = common::config_with_routes(vec![RouteConfig::new("/public", format!("http://{}", backend))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let response = common::client()
        .get(format!("http://{}/unknown/path", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Not found");
    shutdown.trigger();
}

#[tokio::test]
async fn test_path_filter_rejects_with_404() {
    let backend = common::start_echo_backend().await;
    let config = common::config_with_routes(vec![
        RouteConfig::new("/public", format!("http://{}", backend)).with_path_filter(r"^/(items|health)"),
    ]);
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    let allowed = client.get(format!("http://{}/public/items/7", gateway)).send().await.unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);

    let rejected = client.get(format!("http://{}/public/admin", gateway)).send().await.unwrap();
    assert_eq!(rejected.status(), StatusCode::NOT_FOUND);
    shutdown.trigger();
}

#[tokio::test]
async fn test_unreachable_upstream_is_502() {
    let dead = common::closed_port().await;
    let config = common::config_with_routes(vec![RouteConfig::new("/public", format!("http://{}", dead))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let response = common::client()
        .get(format!("http://{}/public/items", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Proxy request failed" }));
    shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_error_status_relayed() {
    let backend = common::start_status_backend(503, "maintenance").await;
    let config = common::config_with_routes(vec![RouteConfig::new("/public", format!("http://{}", backend))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let response = common::client()
        .get(format!("http://{}/public/items", gateway))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response.text().await.unwrap(), "maintenance");
    shutdown.trigger();
}

#[tokio::test]
async fn test_health_and_root_served_locally() {
    let config = common::config_with_routes(Vec::new());
    let (gateway, shutdown) = common::start_gateway(config).await;
    let client = common::client();

    let health: Value = client
        .get(format!("http://{}/health", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({ "status": "healthy", "service": "api-gateway" }));

    let root: Value = client
        .get(format!("http://{}/", gateway))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(root["environment"], "development");
    shutdown.trigger();
}

#[tokio::test]
async fn test_stalled_upstream_body_cut_at_timeout() {
    let backend = common::start_stalling_backend().await;
    let mut config = common::config_with_routes(vec![RouteConfig::new("/public", format!("http://{}", backend))]);
    config.timeouts.upstream_secs = 1;
    let (gateway, shutdown) = common::start_gateway(config).await;

    let response = common::client()
        .get(format!("http://{}/public/slow", gateway))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = tokio::time::timeout(std::time::Duration::from_secs(5), response.bytes())
        .await
        .expect("body should end once the upstream timeout passes");
    assert!(body.is_err());
    shutdown.trigger();
}

#[tokio::test]
async fn test_plain_options_not_forwarded() {
    let backend = common::start_echo_backend().await;
    let config = common::config_with_routes(vec![RouteConfig::new("/public", format!("http://{}", backend))]);
    let (gateway, shutdown) = common::start_gateway(config).await;

    let response = common::client()
        .request(reqwest::Method::OPTIONS, format!("http://{}/public/items", gateway))
        .header("origin", "http://app.example.com")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    shutdown.trigger();
}
