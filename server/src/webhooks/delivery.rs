//! Webhook Delivery
//!
//! The transport capability the dispatcher hands serialized events to, and the
//! default HTTP implementation.
//!
//! A delivery attempt is a single POST. There are no retries: a failed attempt
//! is final for that event and webhook.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tracing::trace;

use super::types::DeliveryError;

/// Sends one serialized event to one webhook URL.
///
/// Implementations must be shareable across tasks; the dispatcher calls `send`
/// concurrently for every matching webhook.
pub trait DeliveryWorker: Send + Sync + 'static {
    fn send(&self, url: &str, body: Bytes)
        -> impl Future<Output = Result<(), DeliveryError>> + Send;
}

/// Delivers events with an HTTP POST.
#[derive(Debug, Clone)]
pub struct HttpDeliveryWorker {
    client: reqwest::Client,
}

impl HttpDeliveryWorker {
    /// Build a worker whose requests time out after `timeout`.
    pub fn new(user_agent: &str, timeout: Duration) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl DeliveryWorker for HttpDeliveryWorker {
    async fn send(&self, url: &str, body: Bytes) -> Result<(), DeliveryError> {
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DeliveryError::TimedOut(start.elapsed())
                } else {
                    DeliveryError::Transport(Box::new(e))
                }
            })?;

        let status = response.status();
        trace!(
            url = %url,
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Webhook endpoint responded"
        );

        if status.is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(status.as_u16()))
        }
    }
}
