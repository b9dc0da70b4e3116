//! Wire payload types exchanged with the chat server.
//!
//! Field names follow the server's camelCase JSON.  The client-only
//! bookkeeping flags (`sending`, `isFake`, `isUpdated`) default to `false`
//! so payloads that omit them decode cleanly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::types::{MediaKind, MessageId, RoomId, UserId};

/// A single attachment carried by a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: i64,
    pub name: String,
    /// Source URI: a server URL for confirmed attachments, a local
    /// preview URI for optimistic ones.
    pub source: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    /// File format, lowercased extension.
    pub format: String,
    pub description: String,
}

/// A chat message as held in the per-room list.
///
/// `id` is positive and server-assigned for confirmed messages; negative
/// for optimistic entries synthesized before confirmation.  The body is
/// nullable: attachment-only messages are legal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub message: Option<String>,
    /// Display name of the sender.
    pub sender: String,
    pub sent_on: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// True while awaiting server confirmation of the outbound post.
    #[serde(default)]
    pub sending: bool,
    /// True for client-synthesized entries not yet superseded by a
    /// confirmed arrival.
    #[serde(default)]
    pub is_fake: bool,
    /// True after a local edit has been applied.
    #[serde(default)]
    pub is_updated: bool,
}

impl Message {
    /// Decode a push-channel payload.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Normalize a delivered payload into its confirmed form.  Whatever
    /// the wire said, a message the server pushed is neither fake nor
    /// still sending.
    pub fn into_confirmed(mut self) -> Self {
        self.sending = false;
        self.is_fake = false;
        self
    }
}

/// A typing indicator event delivered on the room's typing topic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypingEvent {
    pub sender_id: UserId,
    pub avatar: Option<String>,
    pub room_id: RoomId,
    pub typing: bool,
    /// Event time, Unix epoch milliseconds.
    pub timestamp: i64,
    /// Declared time-to-live of the event, milliseconds.
    pub ttl_ms: i64,
}

impl TypingEvent {
    /// Decode a push-channel payload.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Whether this event still indicates active typing at `now_ms`
    /// (Unix epoch milliseconds).  Expired or `typing=false` events are
    /// inactive.
    pub fn is_active_at(&self, now_ms: i64) -> bool {
        self.typing && now_ms.saturating_sub(self.timestamp) <= self.ttl_ms
    }
}

/// Outbound typing signal posted by the local user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypingSignal {
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub avatar: Option<String>,
    pub typing: bool,
}
