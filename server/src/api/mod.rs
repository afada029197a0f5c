//! API Router and Application State
//!
//! Central routing configuration and shared state.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::webhooks::{handlers, Dispatcher, HttpDeliveryWorker, WebhookStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Webhook subscription store
    pub store: WebhookStore,
    /// Event fan-out to webhook endpoints
    pub dispatcher: Dispatcher<HttpDeliveryWorker>,
    /// Server configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(store: WebhookStore, worker: HttpDeliveryWorker, config: Config) -> Self {
        let dispatcher = Dispatcher::new(store.clone(), worker, config.dispatch());
        Self {
            store,
            dispatcher,
            config: Arc::new(config),
        }
    }
}

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    // Admin surface; authentication is enforced in front of this service.
    let admin_routes = Router::new()
        .route("/webhooks", get(handlers::list_webhooks))
        .route("/webhooks/create", post(handlers::create_webhook))
        .route("/webhooks/delete", post(handlers::delete_webhook));

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // Inbound events from platform producers
        .route("/api/webhooks/events", post(handlers::submit_event))
        .nest("/api/admin", admin_routes)
        // Middleware
        .layer(TraceLayer::new_for_http())
        // State
        .with_state(state)
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    /// Service status
    status: &'static str,
    /// When `last_used` is recorded for webhooks
    last_used_policy: &'static str,
}

/// Health check endpoint.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        last_used_policy: state.config.last_used_policy.as_str(),
    })
}
