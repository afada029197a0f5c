//! Livehooks Server
//!
//! Webhook subscriptions and event fan-out for a self-hosted live streaming
//! server. Integrators register a URL and the event types they care about;
//! chat and stream events are then POSTed to every matching endpoint.

pub mod api;
pub mod config;
pub mod db;
pub mod webhooks;
