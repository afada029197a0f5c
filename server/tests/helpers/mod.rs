//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum router,
//! plus a `WebhookReceiver` that plays the part of a subscriber's endpoint.
//!
//! ## Test Servers
//!
//! Use [`spawn_test_server()`] when a real socket is needed, e.g. as the target
//! of webhook deliveries made by `HttpDeliveryWorker`.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{self, HeaderMap, Method, Request, Response, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use livehooks_server::api::{create_router, AppState};
use livehooks_server::config::Config;
use livehooks_server::db;
use livehooks_server::webhooks::{HttpDeliveryWorker, WebhookStore};
use tokio::task::JoinHandle;
use tower::ServiceExt;

// ============================================================================
// TestApp
// ============================================================================

/// Full application router backed by a private in-memory database.
pub struct TestApp {
    pub router: Router,
    pub store: WebhookStore,
    pub config: Arc<Config>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::default_for_test()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let pool = db::create_memory_pool()
            .await
            .expect("Failed to create in-memory database");
        let store = WebhookStore::new(pool);
        let worker = HttpDeliveryWorker::new(&config.user_agent, config.delivery_timeout)
            .expect("Failed to build HTTP client");

        let state = AppState::new(store.clone(), worker, config.clone());
        let router = create_router(state);

        Self {
            router,
            store,
            config: Arc::new(config),
        }
    }

    /// Start building a request.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Build a JSON request.
    pub fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
        Self::request(method, uri)
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }
}

/// Collect a response body and parse it as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}

// ============================================================================
// Test Server
// ============================================================================

/// A running test server bound to a random port.
pub struct TestServer {
    /// Server address (127.0.0.1:PORT).
    pub addr: SocketAddr,
    /// Base URL for HTTP requests (e.g., `http://127.0.0.1:12345`).
    pub url: String,
    /// Handle to the server task for cleanup.
    _handle: JoinHandle<()>,
}

/// Spawn a real HTTP server on a random port.
pub async fn spawn_test_server(router: Router) -> TestServer {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to get local addr");
    let url = format!("http://{addr}");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("Test server failed");
    });

    TestServer {
        addr,
        url,
        _handle: handle,
    }
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind probe listener");
    listener.local_addr().expect("Failed to get local addr")
}

// ============================================================================
// Webhook receiver
// ============================================================================

/// One POST received by a [`WebhookReceiver`].
#[derive(Debug, Clone)]
pub struct ReceivedHook {
    pub name: String,
    pub body: serde_json::Value,
    pub user_agent: Option<String>,
    pub content_type: Option<String>,
}

type Received = Arc<Mutex<Vec<ReceivedHook>>>;

/// A subscriber endpoint. `POST /hooks/{name}` records the delivery, then:
/// - `fail` responds 500
/// - `slow` never responds within any test timeout
/// - anything else responds 200
pub struct WebhookReceiver {
    pub server: TestServer,
    received: Received,
}

impl WebhookReceiver {
    pub async fn spawn() -> Self {
        let received: Received = Arc::default();
        let router = Router::new()
            .route("/hooks/{name}", post(receive_hook))
            .with_state(Arc::clone(&received));
        let server = spawn_test_server(router).await;
        Self { server, received }
    }

    /// URL for a named hook.
    pub fn url(&self, name: &str) -> String {
        format!("{}/hooks/{name}", self.server.url)
    }

    pub fn received(&self) -> Vec<ReceivedHook> {
        self.received.lock().unwrap().clone()
    }

    pub fn received_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.received().into_iter().map(|h| h.name).collect();
        names.sort();
        names
    }
}

async fn receive_hook(
    State(received): State<Received>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let header = |key: &str| {
        headers
            .get(key)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned)
    };

    received.lock().unwrap().push(ReceivedHook {
        name: name.clone(),
        body,
        user_agent: header("user-agent"),
        content_type: header("content-type"),
    });

    match name.as_str() {
        "fail" => StatusCode::INTERNAL_SERVER_ERROR,
        "slow" => {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::OK
        }
        _ => StatusCode::OK,
    }
}
