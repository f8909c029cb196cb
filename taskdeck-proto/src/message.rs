//! Local transcript types for the conversation view.
//!
//! Message identifiers are generated locally (UUID v7 for time-ordering)
//! and are never required to match any server-side identifier; they exist
//! only to key the transcript for rendering.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Locally generated, time-ordered identifier for a transcript message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Creates a new time-ordered message identifier (UUID v7).
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Millisecond-precision UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Creates a timestamp for the current instant.
    #[must_use]
    pub fn now() -> Self {
        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Creates a timestamp from milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Returns the timestamp as milliseconds since the UNIX epoch.
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// The signed-in user.
    User,
    /// The conversational assistant.
    Assistant,
}

/// One entry in the conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    /// Local rendering key, never used for reconciliation.
    pub id: MessageId,
    /// Message author.
    pub sender: Sender,
    /// Message text.
    pub content: String,
    /// Opaque tool-invocation annotations echoed by the service.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<Value>,
    /// Opaque task-mutation annotations echoed by the service.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub task_updates: Vec<Value>,
    /// When the message was appended locally.
    pub timestamp: Timestamp,
}

impl TranscriptMessage {
    /// Creates a user-authored message with the current timestamp.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::User,
            content: content.into(),
            tool_calls: Vec::new(),
            task_updates: Vec::new(),
            timestamp: Timestamp::now(),
        }
    }

    /// Creates an assistant-authored message carrying annotations.
    #[must_use]
    pub fn assistant(
        content: impl Into<String>,
        tool_calls: Vec<Value>,
        task_updates: Vec<Value>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            sender: Sender::Assistant,
            content: content.into(),
            tool_calls,
            task_updates,
            timestamp: Timestamp::now(),
        }
    }
}
