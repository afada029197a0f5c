//! Webhook API Handlers
//!
//! Admin CRUD endpoints and the inbound event endpoint for platform producers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::{info, instrument};

use super::events::WebhookEvent;
use super::types::{
    CreateWebhookRequest, DeleteWebhookRequest, DispatchQuery, DispatchResponse, WebhookError,
    WebhookSubscription,
};
use crate::api::AppState;

/// Generic success response.
#[derive(Debug, Serialize)]
pub struct SimpleResponse {
    pub success: bool,
    pub message: String,
}

/// Validate a URL for webhook delivery.
fn validate_url(url: &str) -> Result<(), WebhookError> {
    if url.len() < 10 || url.len() > 2048 {
        return Err(WebhookError::Validation(
            "URL must be between 10 and 2048 characters".to_string(),
        ));
    }

    let parsed = reqwest::Url::parse(url)
        .map_err(|_| WebhookError::Validation("Invalid URL format".to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(WebhookError::Validation(
            "URL must start with http:// or https://".to_string(),
        ));
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(WebhookError::Validation(
            "URL must contain a host".to_string(),
        ));
    }

    Ok(())
}

/// GET /`api/admin/webhooks`
#[instrument(skip(state))]
pub async fn list_webhooks(
    State(state): State<AppState>,
) -> Result<Json<Vec<WebhookSubscription>>, (StatusCode, String)> {
    let webhooks = state.store.list_all().await?;
    Ok(Json(webhooks))
}

/// POST /`api/admin/webhooks/create`
#[instrument(skip(state))]
pub async fn create_webhook(
    State(state): State<AppState>,
    Json(req): Json<CreateWebhookRequest>,
) -> Result<(StatusCode, Json<WebhookSubscription>), (StatusCode, String)> {
    validate_url(&req.url)?;

    if req.events.is_empty() {
        return Err(WebhookError::Validation(
            "At least one event type is required".to_string(),
        )
        .into());
    }

    let webhook_id = state.store.create(&req.url, req.events).await?;
    let webhook = state
        .store
        .get(webhook_id)
        .await?
        .ok_or(WebhookError::NotFound(webhook_id))?;

    info!(webhook_id, url = %webhook.url, "Webhook created");

    Ok((StatusCode::CREATED, Json(webhook)))
}

/// POST /`api/admin/webhooks/delete`
#[instrument(skip(state))]
pub async fn delete_webhook(
    State(state): State<AppState>,
    Json(req): Json<DeleteWebhookRequest>,
) -> Result<Json<SimpleResponse>, (StatusCode, String)> {
    state.store.delete(req.id).await?;

    info!(webhook_id = req.id, "Webhook deleted");

    Ok(Json(SimpleResponse {
        success: true,
        message: "deleted webhook".to_string(),
    }))
}

/// POST /`api/webhooks/events`
///
/// Fans the event out to subscribed webhooks. With `?wait=true` the response
/// is held until every delivery attempt has concluded.
#[instrument(skip(state, event), fields(event_type = %event.event_type))]
pub async fn submit_event(
    State(state): State<AppState>,
    Query(query): Query<DispatchQuery>,
    Json(event): Json<WebhookEvent>,
) -> Result<Json<DispatchResponse>, (StatusCode, String)> {
    let dispatched = if query.wait {
        state.dispatcher.dispatch_and_wait(&event).await?
    } else {
        state.dispatcher.dispatch(&event, None).await?
    };

    Ok(Json(DispatchResponse { dispatched }))
}
