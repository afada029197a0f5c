//! Webhook Event Dispatch
//!
//! Fans a single event out to every subscribed webhook. The subscription
//! lookup runs inline; each delivery then runs as its own task so a slow or
//! failing endpoint never holds up the others.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, trace, warn};

use super::delivery::DeliveryWorker;
use super::events::{EventTag, WebhookEvent};
use super::store::WebhookStore;
use super::types::{DeliveryError, WebhookError};

/// When a webhook's `last_used` timestamp is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LastUsedPolicy {
    /// After every concluded attempt, successful or not.
    #[default]
    Attempted,
    /// Only after the endpoint accepted the event.
    Delivered,
}

impl LastUsedPolicy {
    pub fn parse_str(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "attempted" => Some(Self::Attempted),
            "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Attempted => "attempted",
            Self::Delivered => "delivered",
        }
    }

    const fn records(self, outcome: &Result<(), DeliveryError>) -> bool {
        match self {
            Self::Attempted => true,
            Self::Delivered => outcome.is_ok(),
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, Copy)]
pub struct DispatchConfig {
    /// Upper bound on one delivery attempt, enforced around the worker.
    pub delivery_timeout: Duration,
    pub last_used_policy: LastUsedPolicy,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(10),
            last_used_policy: LastUsedPolicy::default(),
        }
    }
}

/// One delivery of one event to one webhook.
struct DeliveryJob<W> {
    store: WebhookStore,
    worker: Arc<W>,
    webhook_id: i64,
    url: String,
    event_type: EventTag,
    body: Bytes,
    config: DispatchConfig,
}

impl<W: DeliveryWorker> DeliveryJob<W> {
    async fn run(self) {
        let timeout = self.config.delivery_timeout;
        let outcome = match tokio::time::timeout(timeout, self.worker.send(&self.url, self.body)).await
        {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::TimedOut(timeout)),
        };

        match &outcome {
            Ok(()) => debug!(
                webhook_id = self.webhook_id,
                url = %self.url,
                event_type = %self.event_type,
                "Webhook delivered"
            ),
            Err(e) => warn!(
                webhook_id = self.webhook_id,
                url = %self.url,
                event_type = %self.event_type,
                error = %e,
                "Webhook delivery failed"
            ),
        }

        if self.config.last_used_policy.records(&outcome) {
            // Best-effort: the webhook may have been deleted mid-delivery.
            if let Err(e) = self.store.mark_used(self.webhook_id).await {
                warn!(
                    webhook_id = self.webhook_id,
                    error = %e,
                    "Failed to record webhook as used"
                );
            }
        }
    }
}

/// Sends events to the webhooks subscribed to them.
pub struct Dispatcher<W> {
    store: WebhookStore,
    worker: Arc<W>,
    config: DispatchConfig,
}

impl<W> Clone for Dispatcher<W> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            worker: Arc::clone(&self.worker),
            config: self.config,
        }
    }
}

impl<W: DeliveryWorker> Dispatcher<W> {
    pub fn new(store: WebhookStore, worker: W, config: DispatchConfig) -> Self {
        Self {
            store,
            worker: Arc::new(worker),
            config,
        }
    }

    pub const fn store(&self) -> &WebhookStore {
        &self.store
    }

    /// Dispatch an event and return the number of delivery tasks started.
    ///
    /// Returns once every task is spawned, not once they finish. If `tracker`
    /// is given, each task holds one of its tokens from before spawning until
    /// its attempt (and `last_used` update) concludes. Close the tracker before
    /// waiting on it.
    ///
    /// Only the subscription lookup and event serialization can fail here;
    /// delivery failures stay inside their own task.
    pub async fn dispatch(
        &self,
        event: &WebhookEvent,
        tracker: Option<&TaskTracker>,
    ) -> Result<usize, WebhookError> {
        let webhooks = self.store.list_for_event(&event.event_type).await?;

        if webhooks.is_empty() {
            trace!(event_type = %event.event_type, "No webhooks subscribed to event");
            return Ok(0);
        }

        let body = event.to_bytes()?;
        let count = webhooks.len();

        for webhook in webhooks {
            let token = tracker.map(TaskTracker::token);
            let job = DeliveryJob {
                store: self.store.clone(),
                worker: Arc::clone(&self.worker),
                webhook_id: webhook.id,
                url: webhook.url,
                event_type: event.event_type.clone(),
                body: body.clone(),
                config: self.config,
            };
            spawn_delivery(job, token);
        }

        debug!(event_type = %event.event_type, webhooks = count, "Dispatched event");
        Ok(count)
    }

    /// Dispatch and wait for every delivery attempt to conclude.
    pub async fn dispatch_and_wait(&self, event: &WebhookEvent) -> Result<usize, WebhookError> {
        let tracker = TaskTracker::new();
        let count = self.dispatch(event, Some(&tracker)).await?;
        tracker.close();
        tracker.wait().await;
        Ok(count)
    }

    /// Fire-and-forget entry point for event producers.
    ///
    /// Lookup failures are logged, never returned.
    pub async fn send_event(&self, event: &WebhookEvent) {
        if let Err(e) = self.dispatch(event, None).await {
            warn!(
                event_type = %event.event_type,
                error = %e,
                "Failed to dispatch event to webhooks"
            );
        }
    }
}

/// Spawn a delivery with a panic-catching wrapper.
///
/// The tracker token lives in the outer task, so it is released exactly once
/// whether the delivery finishes or panics.
fn spawn_delivery<W: DeliveryWorker>(job: DeliveryJob<W>, token: Option<TaskTrackerToken>) {
    tokio::spawn(async move {
        let webhook_id = job.webhook_id;
        let handle = tokio::spawn(job.run());
        if let Err(e) = handle.await {
            error!(webhook_id, "Delivery task panicked: {}", e);
        }
        drop(token);
    });
}
