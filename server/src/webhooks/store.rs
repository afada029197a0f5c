//! Webhook Subscription Store
//!
//! Persistent repository of webhook subscriptions.
//! Uses runtime queries (`sqlx::query` / `sqlx::query_as`) to avoid
//! requiring a live database at compile time.
//!
//! Each subscribed event type is its own `webhook_events` row, so matching is a
//! plain equality on a bound parameter. There is no joined event string to
//! split, and no way for one token to match another by substring overlap.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;
use tracing::{debug, trace};

use super::events::{EventTag, EventType};
use super::types::{WebhookError, WebhookSubscription};

#[derive(sqlx::FromRow)]
struct WebhookRow {
    id: i64,
    url: String,
    created: String,
    last_used: Option<String>,
}

#[derive(sqlx::FromRow)]
struct EventRow {
    webhook_id: i64,
    event: String,
}

/// Format a timestamp for storage.
///
/// Fixed microsecond precision with a `Z` suffix keeps lexical order equal to
/// chronological order, which `mark_used` relies on.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(id: i64, field: &'static str, raw: &str) -> Result<DateTime<Utc>, WebhookError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| WebhookError::Parse {
            id,
            field,
            reason: format!("{raw:?}: {e}"),
        })
}

/// Group event rows by webhook, rejecting tokens that are not event types.
fn collect_events(rows: Vec<EventRow>) -> Result<BTreeMap<i64, BTreeSet<EventType>>, WebhookError> {
    let mut events: BTreeMap<i64, BTreeSet<EventType>> = BTreeMap::new();
    for row in rows {
        let event_type = EventType::parse_str(&row.event).ok_or_else(|| WebhookError::Parse {
            id: row.webhook_id,
            field: "events",
            reason: format!("unknown event type {:?}", row.event),
        })?;
        events.entry(row.webhook_id).or_default().insert(event_type);
    }
    Ok(events)
}

fn assemble(
    rows: Vec<WebhookRow>,
    event_rows: Vec<EventRow>,
) -> Result<Vec<WebhookSubscription>, WebhookError> {
    let mut events = collect_events(event_rows)?;

    rows.into_iter()
        .map(|row| {
            let created_at = parse_timestamp(row.id, "created", &row.created)?;
            let last_used_at = row
                .last_used
                .as_deref()
                .map(|raw| parse_timestamp(row.id, "last_used", raw))
                .transpose()?;

            Ok(WebhookSubscription {
                id: row.id,
                url: row.url,
                events: events.remove(&row.id).unwrap_or_default(),
                created_at,
                last_used_at,
            })
        })
        .collect()
}

/// Handle to the webhook tables. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct WebhookStore {
    pool: SqlitePool,
}

impl WebhookStore {
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create a webhook subscribed to `events`.
    ///
    /// The webhook row and its event rows commit together or not at all.
    /// Duplicate event types collapse; an empty set is stored as-is.
    pub async fn create(
        &self,
        url: &str,
        events: impl IntoIterator<Item = EventType>,
    ) -> Result<i64, WebhookError> {
        trace!(url = %url, "Adding new webhook");

        let events: BTreeSet<EventType> = events.into_iter().collect();
        let created = format_timestamp(Utc::now());

        let mut tx = self.pool.begin().await?;

        let id = sqlx::query("INSERT INTO webhooks (url, created) VALUES (?, ?)")
            .bind(url)
            .bind(&created)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        for event in &events {
            sqlx::query("INSERT INTO webhook_events (webhook_id, event) VALUES (?, ?)")
                .bind(id)
                .bind(event.as_str())
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(webhook_id = id, url = %url, events = events.len(), "Webhook created");
        Ok(id)
    }

    /// Delete a webhook. Fails with `NotFound` if no webhook has this id.
    pub async fn delete(&self, id: i64) -> Result<(), WebhookError> {
        trace!(webhook_id = id, "Deleting webhook");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM webhook_events WHERE webhook_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM webhooks WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(WebhookError::NotFound(id));
        }

        tx.commit().await?;

        debug!(webhook_id = id, "Webhook deleted");
        Ok(())
    }

    /// Get a single webhook.
    pub async fn get(&self, id: i64) -> Result<Option<WebhookSubscription>, WebhookError> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<WebhookRow> =
            sqlx::query_as("SELECT id, url, created, last_used FROM webhooks WHERE id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        let event_rows: Vec<EventRow> =
            sqlx::query_as("SELECT webhook_id, event FROM webhook_events WHERE webhook_id = ?")
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;

        tx.commit().await?;

        Ok(assemble(rows, event_rows)?.pop())
    }

    /// List every webhook, oldest first.
    ///
    /// A malformed row fails the whole read with `Parse`; nothing is skipped.
    pub async fn list_all(&self) -> Result<Vec<WebhookSubscription>, WebhookError> {
        let mut tx = self.pool.begin().await?;

        let rows: Vec<WebhookRow> =
            sqlx::query_as("SELECT id, url, created, last_used FROM webhooks ORDER BY id ASC")
                .fetch_all(&mut *tx)
                .await?;

        let event_rows: Vec<EventRow> =
            sqlx::query_as("SELECT webhook_id, event FROM webhook_events")
                .fetch_all(&mut *tx)
                .await?;

        tx.commit().await?;

        assemble(rows, event_rows)
    }

    /// List webhooks subscribed to exactly this event type.
    ///
    /// An unrecognized tag is compared like any other token and so matches
    /// nothing in a well-formed store.
    pub async fn list_for_event(
        &self,
        event: &EventTag,
    ) -> Result<Vec<WebhookSubscription>, WebhookError> {
        let token = event.as_str();

        let mut tx = self.pool.begin().await?;

        let rows: Vec<WebhookRow> = sqlx::query_as(
            r"
            SELECT w.id, w.url, w.created, w.last_used
            FROM webhooks w
            JOIN webhook_events e ON e.webhook_id = w.id
            WHERE e.event = ?
            ORDER BY w.id ASC
            ",
        )
        .bind(token)
        .fetch_all(&mut *tx)
        .await?;

        let event_rows: Vec<EventRow> = sqlx::query_as(
            r"
            SELECT webhook_id, event
            FROM webhook_events
            WHERE webhook_id IN (SELECT webhook_id FROM webhook_events WHERE event = ?)
            ",
        )
        .bind(token)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        trace!(event_type = %token, matched = rows.len(), "Looked up webhooks for event");
        assemble(rows, event_rows)
    }

    /// Record that a delivery was attempted against this webhook.
    ///
    /// `last_used` only moves forward: a clock step backwards leaves the
    /// stored value in place. The comparison is textual, so a malformed stored
    /// value that sorts above RFC3339 (e.g. `yesterday`) is not repaired here
    /// and keeps surfacing as a parse error on reads.
    pub async fn mark_used(&self, id: i64) -> Result<(), WebhookError> {
        let now = format_timestamp(Utc::now());

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE webhooks SET last_used = MAX(COALESCE(last_used, ''), ?) WHERE id = ?",
        )
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(WebhookError::NotFound(id));
        }

        tx.commit().await?;
        Ok(())
    }
}
