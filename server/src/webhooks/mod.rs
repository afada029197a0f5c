//! Webhooks & Event Dispatch
//!
//! Webhook subscriptions persisted in `SQLite`, and concurrent HTTP POST
//! delivery of platform events to the endpoints subscribed to them.

pub mod delivery;
pub mod dispatch;
pub mod events;
pub mod handlers;
pub mod store;
pub mod types;

pub use delivery::{DeliveryWorker, HttpDeliveryWorker};
pub use dispatch::{DispatchConfig, Dispatcher, LastUsedPolicy};
pub use events::{EventTag, EventType, WebhookEvent};
pub use store::WebhookStore;
pub use types::{DeliveryError, WebhookError, WebhookSubscription};
