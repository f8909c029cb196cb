//! HTTP transport for the taskdeck service.
//!
//! Every remote call goes through [`ApiClient::request`], which attaches
//! the bearer credential when required, serializes JSON bodies, and
//! normalizes success and failure into a typed result. The client holds no
//! store state beyond the credential cell; the session store decides when
//! the credential is set or cleared.

use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

/// Errors produced by the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An auth-required call was attempted with no credential present.
    /// Caught locally; no network call is made.
    #[error("not authenticated")]
    Unauthenticated,

    /// Transport-level failure (DNS, connection refused, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with a non-success HTTP status.
    #[error("request failed ({status}): {message}")]
    RequestFailed {
        /// HTTP status code.
        status: u16,
        /// Server-supplied message when parseable, else status-derived.
        message: String,
    },

    /// A success response body could not be interpreted.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Shared HTTP client for the taskdeck service.
///
/// Cheap to share behind an `Arc`; the credential cell is the only interior
/// mutability and is written solely by the session store.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    /// Creates a client for the service at `base_url` (trailing slashes
    /// are trimmed). `timeout` applies per request.
    #[must_use]
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            http: reqwest::Client::new(),
            base_url,
            timeout,
            token: RwLock::new(None),
        }
    }

    /// Replaces the bearer credential used for auth-required calls.
    pub fn set_token(&self, token: impl Into<String>) {
        *self.token.write() = Some(token.into());
    }

    /// Clears the bearer credential.
    pub fn clear_token(&self) {
        *self.token.write() = None;
    }

    /// Returns whether a credential is currently held.
    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token.read().is_some()
    }

    /// Issues one request against the service.
    ///
    /// When `requires_auth` is true the bearer credential is attached;
    /// if none is held the call fails fast with
    /// [`ApiError::Unauthenticated`] before any network activity. A JSON
    /// body is sent when `body` is `Some`. Empty success bodies (e.g. 204
    /// from DELETE) come back as [`Value::Null`].
    ///
    /// # Errors
    ///
    /// [`ApiError::Network`] for transport failures,
    /// [`ApiError::RequestFailed`] for non-success statuses (carrying the
    /// body's `detail` or `error` field when parseable), and
    /// [`ApiError::MalformedResponse`] when a success body is not JSON.
    pub async fn request<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        requires_auth: bool,
    ) -> Result<Value, ApiError> {
        let token = if requires_auth {
            Some(self.token.read().clone().ok_or(ApiError::Unauthenticated)?)
        } else {
            None
        };

        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%method, %url, requires_auth, "issuing request");

        let mut request = self.http.request(method, &url).timeout(self.timeout);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = error_message(status, &text);
            tracing::debug!(status = status.as_u16(), %message, "request failed");
            return Err(ApiError::RequestFailed {
                status: status.as_u16(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::MalformedResponse(e.to_string()))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("has_token", &self.has_token())
            .finish_non_exhaustive()
    }
}

/// Extracts a human-readable error from a failure body, preferring the
/// service's `detail` field (FastAPI convention), then `error`, falling
/// back to a status-derived message.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["detail", "error"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }
    format!("HTTP {status}")
}
