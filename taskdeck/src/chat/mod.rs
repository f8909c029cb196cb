//! Conversation ownership: the transcript and the assistant exchange.
//!
//! The transcript is strictly append-only and ordered by creation. The
//! user's own message is appended optimistically (it reflects intent, not
//! a server fact, so it is never rolled back); every failure path appends
//! a fixed-text assistant turn so the transcript never shows a dangling
//! unanswered user message.

use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use taskdeck_proto::chat::{AssistantReply, ChatRequest, ReplyParseError};
use taskdeck_proto::message::{Sender, TranscriptMessage};
use taskdeck_proto::user::UserId;

use crate::client::{ApiClient, ApiError};

/// Fixed assistant turn appended when an exchange fails.
pub const ASSISTANT_ERROR_TEXT: &str =
    "Sorry, I encountered an error processing your request. Please try again.";

/// Assistant turn seeding a fresh transcript.
pub const ASSISTANT_GREETING: &str =
    "Hello! I'm your AI assistant. How can I help you manage your tasks today?";

/// Errors from conversation operations.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The remote call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The service reply carried no recognizable text.
    #[error("unintelligible assistant reply: {0}")]
    Reply(#[from] ReplyParseError),
}

/// Owns the ordered message transcript and the conversation identity.
///
/// `conversation_id` is assigned by the service on the first successful
/// turn and reused for every later turn; once assigned it is immutable
/// for the life of the store. Annotations (`tool_calls`, `task_updates`)
/// are carried on assistant messages verbatim and never interpreted here
/// — acting on them (e.g. refreshing the task collection) is the
/// consuming view's responsibility.
pub struct ConversationStore {
    client: Arc<ApiClient>,
    conversation_id: Option<String>,
    messages: Vec<TranscriptMessage>,
    is_loading: bool,
}

impl ConversationStore {
    /// Creates a store with an empty transcript.
    #[must_use]
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self {
            client,
            conversation_id: None,
            messages: Vec::new(),
            is_loading: false,
        }
    }

    /// Seeds the transcript with the assistant greeting.
    #[must_use]
    pub fn with_greeting(mut self) -> Self {
        self.messages.push(TranscriptMessage::assistant(
            ASSISTANT_GREETING,
            Vec::new(),
            Vec::new(),
        ));
        self
    }

    /// Read-only snapshot of the transcript.
    #[must_use]
    pub fn messages(&self) -> &[TranscriptMessage] {
        &self.messages
    }

    /// The server-assigned conversation identity, once known.
    #[must_use]
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Whether an exchange is in flight (views disable input meanwhile).
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// The most recent assistant turn, if any.
    #[must_use]
    pub fn last_reply(&self) -> Option<&TranscriptMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.sender == Sender::Assistant)
    }

    /// Sends one conversational turn to `POST /{user_id}/chat`.
    ///
    /// The user message is appended before the remote call. On success the
    /// assistant turn is appended with the reply text and any annotations
    /// echoed by the service, and a first-turn `conversation_id` is
    /// adopted. On any failure (network, server error, unintelligible
    /// reply) a fixed-text assistant turn is appended instead and the
    /// failure propagates. The loading flag is cleared on every path.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::Api`] for transport or service failures, and
    /// [`ChatError::Reply`] when the reply carries no recognizable text.
    pub async fn send_message(&mut self, user_id: &UserId, content: &str) -> Result<(), ChatError> {
        self.messages.push(TranscriptMessage::user(content));
        self.is_loading = true;

        let request = ChatRequest {
            content: content.to_string(),
            conversation_id: self.conversation_id.clone(),
        };
        let result = self.exchange(user_id, &request).await;
        self.is_loading = false;

        match result {
            Ok(reply) => {
                if self.conversation_id.is_none() {
                    self.conversation_id.clone_from(&reply.conversation_id);
                }
                self.messages.push(TranscriptMessage::assistant(
                    reply.text,
                    reply.tool_calls,
                    reply.task_updates,
                ));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "assistant exchange failed");
                self.messages.push(TranscriptMessage::assistant(
                    ASSISTANT_ERROR_TEXT,
                    Vec::new(),
                    Vec::new(),
                ));
                Err(err)
            }
        }
    }

    /// Task-update annotations of the most recent assistant turn.
    ///
    /// Convenience for view layers deciding whether to refresh the task
    /// collection after an exchange.
    #[must_use]
    pub fn pending_task_updates(&self) -> &[Value] {
        self.last_reply()
            .map_or(&[], |reply| reply.task_updates.as_slice())
    }

    async fn exchange(
        &self,
        user_id: &UserId,
        request: &ChatRequest,
    ) -> Result<AssistantReply, ChatError> {
        let value = self
            .client
            .request(Method::POST, &format!("/{user_id}/chat"), Some(request), true)
            .await?;
        Ok(AssistantReply::parse(&value)?)
    }
}
