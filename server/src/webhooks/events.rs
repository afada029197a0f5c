//! Webhook Event Types & Envelope
//!
//! The closed set of event types a subscription can ask for, plus the envelope
//! that carries a single occurrence to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event types a webhook can subscribe to.
///
/// The camelCase string form is the token persisted in `webhook_events.event`
/// and sent as the envelope `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    /// A chat message was sent.
    MessageSent,
    /// A user joined the chat.
    UserJoined,
    /// A user left the chat.
    UserParted,
    /// A user changed their display name.
    UserNameChanged,
    /// A moderator hid or re-showed chat messages.
    VisibilityToggled,
    /// The stream went live.
    StreamStarted,
    /// The stream went offline.
    StreamStopped,
    /// The stream title was changed.
    StreamTitleUpdated,
}

impl EventType {
    /// Every known event type.
    pub const ALL: &'static [Self] = &[
        Self::MessageSent,
        Self::UserJoined,
        Self::UserParted,
        Self::UserNameChanged,
        Self::VisibilityToggled,
        Self::StreamStarted,
        Self::StreamStopped,
        Self::StreamTitleUpdated,
    ];

    /// Parse from the exact token (e.g., `"userJoined"`).
    ///
    /// Tokens are compared whole; `"userJoinedExtra"` or `"Joined"` are not
    /// event types.
    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "messageSent" => Some(Self::MessageSent),
            "userJoined" => Some(Self::UserJoined),
            "userParted" => Some(Self::UserParted),
            "userNameChanged" => Some(Self::UserNameChanged),
            "visibilityToggled" => Some(Self::VisibilityToggled),
            "streamStarted" => Some(Self::StreamStarted),
            "streamStopped" => Some(Self::StreamStopped),
            "streamTitleUpdated" => Some(Self::StreamTitleUpdated),
            _ => None,
        }
    }

    /// Convert to the persisted token form.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MessageSent => "messageSent",
            Self::UserJoined => "userJoined",
            Self::UserParted => "userParted",
            Self::UserNameChanged => "userNameChanged",
            Self::VisibilityToggled => "visibilityToggled",
            Self::StreamStarted => "streamStarted",
            Self::StreamStopped => "streamStopped",
            Self::StreamTitleUpdated => "streamTitleUpdated",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `type` tag of an incoming envelope.
///
/// Producers may be newer than this server, so an unrecognized tag is kept
/// verbatim instead of failing deserialization. It matches no subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTag {
    Known(EventType),
    Unrecognized(String),
}

impl EventTag {
    /// Build a tag from a raw token, recognizing known event types.
    pub fn from_token(token: &str) -> Self {
        EventType::parse_str(token).map_or_else(|| Self::Unrecognized(token.to_owned()), Self::Known)
    }

    /// The known event type, if any.
    pub const fn known(&self) -> Option<EventType> {
        match self {
            Self::Known(event_type) => Some(*event_type),
            Self::Unrecognized(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Known(event_type) => event_type.as_str(),
            Self::Unrecognized(raw) => raw,
        }
    }
}

impl From<EventType> for EventTag {
    fn from(event_type: EventType) -> Self {
        Self::Known(event_type)
    }
}

impl std::fmt::Display for EventTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single occurrence sent to every matching webhook.
///
/// `event_data` is opaque to the dispatcher; its shape depends on the type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: EventTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_data: Option<serde_json::Value>,
}

impl WebhookEvent {
    pub fn new(event_type: impl Into<EventTag>, event_data: Option<serde_json::Value>) -> Self {
        Self {
            event_type: event_type.into(),
            event_data,
        }
    }

    /// Build an envelope from a typed payload.
    pub fn with_payload<T: Serialize>(
        event_type: EventType,
        payload: &T,
    ) -> serde_json::Result<Self> {
        Ok(Self::new(event_type, Some(serde_json::to_value(payload)?)))
    }

    pub fn chat_message(payload: &ChatMessagePayload) -> serde_json::Result<Self> {
        Self::with_payload(EventType::MessageSent, payload)
    }

    /// A moderated message, re-sent with its new `visible` flag.
    pub fn visibility_toggled(payload: &ChatMessagePayload) -> serde_json::Result<Self> {
        Self::with_payload(EventType::VisibilityToggled, payload)
    }

    pub fn user_joined(payload: &UserPayload) -> serde_json::Result<Self> {
        Self::with_payload(EventType::UserJoined, payload)
    }

    pub fn user_parted(payload: &UserPayload) -> serde_json::Result<Self> {
        Self::with_payload(EventType::UserParted, payload)
    }

    pub fn name_changed(payload: &NameChangePayload) -> serde_json::Result<Self> {
        Self::with_payload(EventType::UserNameChanged, payload)
    }

    /// Stream lifecycle events carry the same status payload.
    ///
    /// Returns `None` for event types that are not stream status events.
    pub fn stream_status(
        event_type: EventType,
        payload: &StreamStatusPayload,
    ) -> Option<serde_json::Result<Self>> {
        match event_type {
            EventType::StreamStarted | EventType::StreamStopped | EventType::StreamTitleUpdated => {
                Some(Self::with_payload(event_type, payload))
            }
            _ => None,
        }
    }

    /// Serialize the envelope for transport.
    pub fn to_bytes(&self) -> serde_json::Result<bytes::Bytes> {
        serde_json::to_vec(self).map(bytes::Bytes::from)
    }
}

/// A chat participant as seen by webhook consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatUser {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub display_color: i32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub previous_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_changed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub authenticated: bool,
}

/// Payload for `messageSent` and `visibilityToggled`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagePayload {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<ChatUser>,
    pub body: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub raw_body: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<u64>,
    pub visible: bool,
}

/// Payload for `userJoined` and `userParted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPayload {
    pub id: String,
    pub user: ChatUser,
    pub timestamp: DateTime<Utc>,
}

/// Payload for `userNameChanged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameChangePayload {
    pub id: String,
    pub user: ChatUser,
    pub new_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Payload for stream lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatusPayload {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub stream_title: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
