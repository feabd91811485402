//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    body::Bytes,
    http::{HeaderMap, Method, Uri},
    Json, Router,
};
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use api_gateway::config::{GatewayConfig, RouteConfig};
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::Shutdown;

/// Start a mock upstream that echoes what it received as JSON:
/// `{method, path, query, headers, body}`.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = Router::new().fallback(echo);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    addr
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let mut echoed = Map::new();
    for name in headers.keys() {
        let values: Vec<&str> = headers
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        echoed.insert(name.as_str().to_string(), Value::String(values.join(",")));
    }

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "headers": echoed,
        "body": String::from_utf8_lossy(&body),
    }))
}

/// Start a mock upstream that answers every request with a fixed status and body.
pub async fn start_status_backend(status: u16, body: &'static str) -> SocketAddr {
    start_raw_backend(status, "", body).await
}

/// Like [`start_status_backend`], with extra raw header lines
/// (each ending in `\r\n`) in every response.
pub async fn start_raw_backend(status: u16, extra_headers: &'static str, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {} Custom\r\nContent-Length: {}\r\nConnection: close\r\n{}\r\n{}",
                    status,
                    body.len(),
                    extra_headers,
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Start a mock upstream that promises `Content-Length: 100`, sends three
/// bytes and then holds the connection open without sending more.
pub async fn start_stalling_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\nabc")
                    .await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Gateway config with the given routes and the global limiter disabled.
pub fn config_with_routes(routes: Vec<RouteConfig>) -> GatewayConfig {
    let mut config = GatewayConfig {
        routes,
        ..GatewayConfig::default()
    };
    config.rate_limit.enabled = false;
    config
}

/// Run a gateway on an ephemeral port. Trigger the returned `Shutdown` to stop it.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();

    let server = HttpServer::new(&config).unwrap();
    let handle = shutdown.clone();
    tokio::spawn(async move {
        let _ = server.run(listener, handle).await;
    });

    wait_for_server(addr).await;
    (addr, shutdown)
}

/// Wait until `addr` accepts connections.
pub async fn wait_for_server(addr: SocketAddr) {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server at {} did not start", addr);
}

/// Send a raw HTTP/1.1 request and return the full response text.
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// HTTP client that ignores proxy environment variables.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// The JSON object in a raw HTTP response.
pub fn json_from_raw(response: &str) -> Value {
    let start = response.find('{').unwrap();
    let end = response.rfind('}').unwrap();
    serde_json::from_str(&response[start..=end]).unwrap()
}
