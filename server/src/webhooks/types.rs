//! Webhook Types
//!
//! Data structures for subscriptions, admin requests, and errors.

use std::collections::BTreeSet;
use std::time::Duration;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::events::EventType;

/// A registered webhook destination and the events it wants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSubscription {
    pub id: i64,
    pub url: String,
    /// Subscribed event types. An empty set matches nothing.
    pub events: BTreeSet<EventType>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Request to create a webhook.
#[derive(Debug, Deserialize)]
pub struct CreateWebhookRequest {
    pub url: String,
    pub events: Vec<EventType>,
}

/// Request to delete a webhook.
#[derive(Debug, Deserialize)]
pub struct DeleteWebhookRequest {
    pub id: i64,
}

/// Query options for the inbound event endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct DispatchQuery {
    /// Wait for every delivery attempt to conclude before responding.
    #[serde(default)]
    pub wait: bool,
}

/// Result of an inbound event submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub dispatched: usize,
}

/// Webhook store and API errors.
#[derive(Error, Debug)]
pub enum WebhookError {
    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("Webhook {0} not found")]
    NotFound(i64),
    #[error("Malformed {field} on webhook {id}: {reason}")]
    Parse {
        id: i64,
        field: &'static str,
        reason: String,
    },
    #[error("Failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Validation: {0}")]
    Validation(String),
}

impl WebhookError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<WebhookError> for (StatusCode, String) {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
            WebhookError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            WebhookError::Persistence(_)
            | WebhookError::Parse { .. }
            | WebhookError::Serialize(_) => {
                tracing::error!(error = %err, "Webhook storage failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }
}

/// A single delivery attempt failed. Never propagated past its own task.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("endpoint responded with HTTP {0}")]
    Status(u16),
    #[error("delivery timed out after {0:?}")]
    TimedOut(Duration),
}
