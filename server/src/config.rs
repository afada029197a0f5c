//! Server Configuration
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use anyhow::{bail, Result};

use crate::webhooks::dispatch::{DispatchConfig, LastUsedPolicy};

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (e.g., "0.0.0.0:8080")
    pub bind_address: String,

    /// `SQLite` connection URL
    pub database_url: String,

    /// Upper bound on a single webhook delivery attempt (default: 10s)
    pub delivery_timeout: Duration,

    /// When a webhook's `last_used` is recorded
    pub last_used_policy: LastUsedPolicy,

    /// `User-Agent` sent with webhook deliveries
    pub user_agent: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let last_used_policy = match env::var("WEBHOOK_LAST_USED_POLICY") {
            Ok(raw) => match LastUsedPolicy::parse_str(&raw) {
                Some(policy) => policy,
                None => bail!("WEBHOOK_LAST_USED_POLICY must be 'attempted' or 'delivered', got {raw:?}"),
            },
            Err(_) => LastUsedPolicy::default(),
        };

        Ok(Self {
            bind_address: env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/webhooks.db".into()),
            delivery_timeout: Duration::from_secs(
                env::var("WEBHOOK_DELIVERY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .filter(|secs| *secs > 0)
                    .unwrap_or(10),
            ),
            last_used_policy,
            user_agent: env::var("WEBHOOK_USER_AGENT").unwrap_or_else(|_| default_user_agent()),
        })
    }

    /// Dispatcher settings derived from this configuration.
    #[must_use]
    pub const fn dispatch(&self) -> DispatchConfig {
        DispatchConfig {
            delivery_timeout: self.delivery_timeout,
            last_used_policy: self.last_used_policy,
        }
    }

    /// Create a default configuration for testing (in-memory database).
    #[must_use]
    pub fn default_for_test() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".into(),
            database_url: "sqlite::memory:".into(),
            delivery_timeout: Duration::from_secs(2),
            last_used_policy: LastUsedPolicy::Attempted,
            user_agent: default_user_agent(),
        }
    }
}

fn default_user_agent() -> String {
    format!("livehooks/{}", env!("CARGO_PKG_VERSION"))
}
