//! Session ownership: the authenticated identity and its lifecycle.
//!
//! [`SessionStore`] is a four-state machine (`Anonymous`, `Authenticating`,
//! `Authenticated`, `Error`) built on the transport client and a
//! [`CredentialStore`]. Login and register persist the credential and
//! identity together and signal the view layer over an event channel;
//! restore recovers them at process start, downgrading malformed persisted
//! state to an anonymous session.

pub mod storage;

use std::sync::Arc;

use reqwest::Method;
use tokio::sync::mpsc;

use taskdeck_proto::user::{AuthResponse, Credentials, UserIdentity};

use crate::client::{ApiClient, ApiError};

use storage::{CredentialStore, PersistedSession};

/// Where the consuming view should navigate after a session transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// The public landing area.
    Home,
    /// The authenticated dashboard.
    Dashboard,
}

/// Events emitted for the view layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The view should navigate to the given route.
    Navigate(Route),
}

/// Exclusive session states; exactly one holds at any time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No identity held.
    Anonymous,
    /// A login or registration exchange is in flight.
    Authenticating,
    /// An identity and credential are held.
    Authenticated(UserIdentity),
    /// The last authentication attempt failed with this message.
    Error(String),
}

/// Owns the authenticated identity and the credential lifecycle.
///
/// The credential and identity are set and cleared together, both in
/// memory (transport token + state) and in durable storage (a single
/// [`PersistedSession`] record).
pub struct SessionStore<S: CredentialStore> {
    client: Arc<ApiClient>,
    storage: S,
    state: SessionState,
    event_tx: mpsc::Sender<SessionEvent>,
}

impl<S: CredentialStore> SessionStore<S> {
    /// Creates an anonymous session store.
    ///
    /// Returns the store and a receiver for [`SessionEvent`]s that the
    /// view layer should consume.
    pub fn new(
        client: Arc<ApiClient>,
        storage: S,
        event_buffer: usize,
    ) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(event_buffer);
        let store = Self {
            client,
            storage,
            state: SessionState::Anonymous,
            event_tx,
        };
        (store, event_rx)
    }

    /// Current session state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Pure projection: whether the state is `Authenticated`.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated(_))
    }

    /// The authenticated identity, when one is held.
    #[must_use]
    pub const fn user(&self) -> Option<&UserIdentity> {
        match &self.state {
            SessionState::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    /// Restores a persisted session at process start.
    ///
    /// Missing data leaves the session anonymous. Malformed or unreadable
    /// persisted state is logged and downgraded to anonymous — never an
    /// error to the caller.
    pub fn restore(&mut self) {
        match self.storage.load() {
            Ok(Some(session)) => {
                self.client.set_token(session.token);
                self.state = SessionState::Authenticated(session.user);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable persisted session");
            }
        }
    }

    /// Authenticates against `POST /auth/login`.
    ///
    /// On success the credential and identity are persisted together, the
    /// transport token is set, the state becomes `Authenticated`, and a
    /// [`Route::Dashboard`] navigation is signaled. On failure the state
    /// becomes `Error` with the failure message, and the same failure is
    /// re-raised so an active caller can react as well.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ApiError`] from the exchange.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<(), ApiError> {
        self.authenticate("/auth/login", credentials).await
    }

    /// Authenticates against `POST /auth/register`; same contract as
    /// [`login`](Self::login).
    ///
    /// # Errors
    ///
    /// Returns the underlying [`ApiError`] from the exchange.
    pub async fn register(&mut self, credentials: &Credentials) -> Result<(), ApiError> {
        self.authenticate("/auth/register", credentials).await
    }

    /// Destroys the session: clears durable storage and the transport
    /// token, becomes `Anonymous`, and signals navigation to the public
    /// area. Always succeeds; no network effect.
    pub fn logout(&mut self) {
        if let Err(e) = self.storage.clear() {
            tracing::warn!(error = %e, "failed to clear persisted session");
        }
        self.client.clear_token();
        self.state = SessionState::Anonymous;
        self.emit(SessionEvent::Navigate(Route::Home));
    }

    /// Transitions `Error -> Anonymous` without side effects.
    pub fn clear_error(&mut self) {
        if matches!(self.state, SessionState::Error(_)) {
            self.state = SessionState::Anonymous;
        }
    }

    async fn authenticate(&mut self, path: &str, credentials: &Credentials) -> Result<(), ApiError> {
        self.state = SessionState::Authenticating;

        match self.exchange(path, credentials).await {
            Ok(auth) => {
                // Persistence failure is not fatal: the in-memory session
                // stays valid for this process, it just won't survive a
                // restart.
                let record = PersistedSession {
                    token: auth.token.clone(),
                    user: auth.user.clone(),
                };
                if let Err(e) = self.storage.save(&record) {
                    tracing::warn!(error = %e, "failed to persist session");
                }
                self.client.set_token(auth.token);
                self.state = SessionState::Authenticated(auth.user);
                self.emit(SessionEvent::Navigate(Route::Dashboard));
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Error(err.to_string());
                Err(err)
            }
        }
    }

    async fn exchange(&self, path: &str, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        let value = self
            .client
            .request(Method::POST, path, Some(credentials), false)
            .await?;
        serde_json::from_value(value).map_err(|e| ApiError::MalformedResponse(e.to_string()))
    }

    /// Best-effort event emission — a full channel drops the event rather
    /// than blocking a store operation.
    fn emit(&self, event: SessionEvent) {
        let _ = self.event_tx.try_send(event);
    }
}
