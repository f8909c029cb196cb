//! Assistant exchange shapes for `POST /{user_id}/chat`.
//!
//! The service has shipped the reply text under both `content` and
//! `response` at different times, so [`AssistantReply::parse`] tries the
//! known field names in a fixed priority order and fails loudly when
//! neither is present instead of coercing a missing field into empty text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for a single conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The user's message text.
    pub content: String,
    /// Continuation of an earlier exchange; omitted on the first turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Error returned when an assistant reply cannot be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReplyParseError {
    /// The reply body was not a JSON object.
    #[error("assistant reply is not a JSON object")]
    NotAnObject,
    /// Neither `content` nor `response` carried the reply text.
    #[error("assistant reply carries no text in `content` or `response`")]
    MissingText,
}

/// A parsed assistant reply.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistantReply {
    /// The assistant's reply text.
    pub text: String,
    /// Conversation identifier assigned by the service, when present.
    pub conversation_id: Option<String>,
    /// Opaque annotations describing tool invocations the service performed.
    pub tool_calls: Vec<Value>,
    /// Opaque annotations referencing task mutations; never interpreted
    /// client-side beyond an emptiness check.
    pub task_updates: Vec<Value>,
}

impl AssistantReply {
    /// Parses a raw response body into a reply.
    ///
    /// Reply text is taken from `content`, then `response`, in that order.
    /// Annotation lists default to empty when absent or not arrays.
    ///
    /// # Errors
    ///
    /// Returns [`ReplyParseError::NotAnObject`] for non-object bodies and
    /// [`ReplyParseError::MissingText`] when no known text field is a string.
    pub fn parse(value: &Value) -> Result<Self, ReplyParseError> {
        let obj = value.as_object().ok_or(ReplyParseError::NotAnObject)?;

        let text = ["content", "response"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .ok_or(ReplyParseError::MissingText)?
            .to_string();

        Ok(Self {
            text,
            conversation_id: obj
                .get("conversation_id")
                .and_then(Value::as_str)
                .map(str::to_string),
            tool_calls: annotation_list(obj.get("tool_calls")),
            task_updates: annotation_list(obj.get("task_updates")),
        })
    }
}

/// Clones an annotation array, defaulting to empty for anything else.
fn annotation_list(value: Option<&Value>) -> Vec<Value> {
    value.and_then(Value::as_array).cloned().unwrap_or_default()
}
