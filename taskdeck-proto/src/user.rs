//! Account identity and authentication payloads.
//!
//! Field names match the service's JSON exactly (snake_case). Server
//! timestamps are carried as opaque strings and never parsed client-side.

use serde::{Deserialize, Serialize};

/// Server-assigned user identifier (opaque string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps an identifier string as reported by the service.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An authenticated account as the service reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    /// Server-assigned identifier, immutable for the account's life.
    pub id: UserId,
    /// The account's email address.
    pub email: String,
    /// Opaque server timestamp of account creation.
    pub created_at: String,
}

/// Request body for `POST /auth/login` and `POST /auth/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Email address identifying the account.
    pub email: String,
    /// Plaintext password; only ever sent over the transport, never stored.
    pub password: String,
}

/// Successful authentication response: `{token, user}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    /// Opaque bearer token proving the identity to the service.
    pub token: String,
    /// The identity the token belongs to.
    pub user: UserIdentity,
}
