//! Shared utilities for integration testing.
//!
//! Every mock binds to an ephemeral port so tests can run in parallel.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;

use tryon_relay::config::RelayConfig;
use tryon_relay::http::HttpServer;
use tryon_relay::lifecycle::Shutdown;
use tryon_relay::relay::Credentials;

pub const TEST_TOKEN: &str = "test-bearer-token";
pub const TEST_KEY: &str = "test-api-key";

async fn bind_ephemeral() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Serves `/img/{name}` as the bytes `IMG:{name}` and `/missing/{name}` as 404.
pub struct ImageHost {
    pub addr: SocketAddr,
    pub hits: Arc<AtomicUsize>,
}

impl ImageHost {
    pub fn url(&self, name: &str) -> String {
        format!("http://{}/img/{}", self.addr, name)
    }

    pub fn missing_url(&self, name: &str) -> String {
        format!("http://{}/missing/{}", self.addr, name)
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

pub async fn start_image_host() -> ImageHost {
    start_slow_image_host(Duration::ZERO).await
}

/// Like [`start_image_host`], but every image response waits `delay` first.
pub async fn start_slow_image_host(delay: Duration) -> ImageHost {
    let hits = Arc::new(AtomicUsize::new(0));
    let (listener, addr) = bind_ephemeral().await;

    let app = Router::new()
        .route(
            "/img/{name}",
            get(move |State(hits): State<Arc<AtomicUsize>>, Path(name): Path<String>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                ([(header::CONTENT_TYPE, "image/jpeg")], format!("IMG:{name}"))
            }),
        )
        .route(
            "/missing/{name}",
            get(|State(hits): State<Arc<AtomicUsize>>| async move {
                hits.fetch_add(1, Ordering::SeqCst);
                StatusCode::NOT_FOUND
            }),
        )
        .with_state(hits.clone());

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    ImageHost { addr, hits }
}

/// What the mock upstream answers with.
#[derive(Clone)]
pub enum Reply {
    Json(StatusCode, Value),
    Raw(StatusCode, &'static str),
}

/// One request received by the mock upstream.
#[derive(Clone, Debug)]
pub struct CapturedRequest {
    pub content_type: String,
    pub authorization: String,
    pub api_key: String,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn boundary(&self) -> &str {
        self.content_type
            .split_once("boundary=")
            .map(|(_, b)| b)
            .expect("content type carries a boundary")
    }
}

#[derive(Clone)]
struct UpstreamState {
    reply: Reply,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    pub captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockUpstream {
    pub fn endpoint(&self) -> String {
        format!("http://{}/api/tryon/v2/tasks", self.addr)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().unwrap().clone()
    }
}

async fn upstream_handler(
    State(state): State<UpstreamState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    state.captured.lock().unwrap().push(CapturedRequest {
        content_type: header("content-type"),
        authorization: header("authorization"),
        api_key: header("x-api-key"),
        body: body.to_vec(),
    });

    match state.reply {
        Reply::Json(status, value) => (status, axum::Json(value)).into_response(),
        Reply::Raw(status, text) => (status, text).into_response(),
    }
}

pub async fn start_upstream(reply: Reply) -> MockUpstream {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let (listener, addr) = bind_ephemeral().await;

    let app = Router::new()
        .route("/api/tryon/v2/tasks", post(upstream_handler))
        .with_state(UpstreamState {
            reply,
            captured: captured.clone(),
        });

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream { addr, captured }
}

pub fn test_config(upstream_endpoint: &str) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.upstream.endpoint = upstream_endpoint.to_string();
    config.timeouts.fetch_secs = 5;
    config.timeouts.upstream_secs = 5;
    config
}

pub fn test_server(upstream_endpoint: &str) -> HttpServer {
    HttpServer::new(
        test_config(upstream_endpoint),
        Credentials::new(TEST_TOKEN, TEST_KEY),
    )
    .unwrap()
}

/// A relay listening on an ephemeral port.
pub struct RunningRelay {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl RunningRelay {
    pub fn tryon_url(&self) -> String {
        format!("http://{}/api/tryon", self.addr)
    }
}

impl Drop for RunningRelay {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_relay(upstream_endpoint: &str) -> RunningRelay {
    let server = test_server(upstream_endpoint);
    let (listener, addr) = bind_ephemeral().await;
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    RunningRelay { addr, shutdown }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// One part of a received multipart body.
#[derive(Debug)]
pub struct FormPart {
    pub name: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, w)| *w == needle)
        .map(|(i, _)| i)
        .collect()
}

fn quoted_param(line: &str, key: &str) -> Option<String> {
    let marker = format!("{key}=\"");
    let start = line.find(&marker)? + marker.len();
    let end = line[start..].find('"')? + start;
    Some(line[start..end].to_string())
}

/// Split a multipart body framed with `boundary`, asserting the framing
/// along the way.
pub fn parse_form(body: &[u8], boundary: &str) -> Vec<FormPart> {
    let delimiter = format!("--{boundary}").into_bytes();
    let closing = format!("--{boundary}--\r\n").into_bytes();
    assert!(body.starts_with(&delimiter), "body must open with the delimiter");
    assert!(body.ends_with(&closing), "body must end with the closing delimiter");

    let positions = find_all(body, &delimiter);
    let mut parts = Vec::new();

    for pair in positions.windows(2) {
        let segment = &body[pair[0] + delimiter.len()..pair[1]];
        let segment = segment.strip_prefix(b"\r\n").expect("CRLF after delimiter");
        let segment = segment.strip_suffix(b"\r\n").expect("CRLF before next delimiter");

        let split = find_all(segment, b"\r\n\r\n")[0];
        let headers = std::str::from_utf8(&segment[..split]).unwrap();
        let body = segment[split + 4..].to_vec();

        let mut name = None;
        let mut filename = None;
        let mut content_type = None;
        for line in headers.split("\r\n") {
            if let Some(rest) = line.strip_prefix("Content-Disposition: form-data;") {
                name = quoted_param(rest, "name");
                filename = quoted_param(rest, "filename");
            } else if let Some(rest) = line.strip_prefix("Content-Type: ") {
                content_type = Some(rest.to_string());
            }
        }

        parts.push(FormPart {
            name: name.expect("part has a name"),
            filename,
            content_type,
            body,
        });
    }

    parts
}
