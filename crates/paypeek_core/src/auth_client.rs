//! crates/paypeek_core/src/auth_client.rs
//!
//! The stateful client side of the identity provider: it keeps the provider
//! session, the pending PKCE verifier of a federated sign-in, and publishes
//! session-change events to whoever subscribed.

use crate::domain::{ProviderSession, User, UserMetadata};
use crate::ports::{IdentityProvider, PortError, PortResult, SignUpOutcome};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const EVENT_CAPACITY: usize = 16;
const REFRESH_RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(10);

/// Refresh this many seconds before the access token expires.
pub const DEFAULT_REFRESH_MARGIN_SECS: i64 = 60;

/// A change to the provider session, pushed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(User),
    TokenRefreshed(User),
    SignedOut,
}

impl AuthEvent {
    /// The user this event leaves signed in, if any.
    pub fn user(&self) -> Option<&User> {
        match self {
            AuthEvent::SignedIn(user) | AuthEvent::TokenRefreshed(user) => Some(user),
            AuthEvent::SignedOut => None,
        }
    }
}

pub struct AuthClient {
    provider: Arc<dyn IdentityProvider>,
    session: Mutex<Option<ProviderSession>>,
    pending_verifier: Mutex<Option<String>>,
    events: broadcast::Sender<AuthEvent>,
    session_changed: Notify,
    refresh_margin: Duration,
}

impl AuthClient {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self::with_session(provider, None)
    }

    /// Creates a client that starts from a previously persisted session.
    pub fn with_session(provider: Arc<dyn IdentityProvider>, session: Option<ProviderSession>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            provider,
            session: Mutex::new(session),
            pending_verifier: Mutex::new(None),
            events,
            session_changed: Notify::new(),
            refresh_margin: Duration::seconds(DEFAULT_REFRESH_MARGIN_SECS),
        }
    }

    pub fn with_refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Subscribes to session-change events. Only events sent after this call are received.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.session.lock().await.as_ref().map(|s| s.user.clone())
    }

    /// Returns the stored session, refreshing it first when it is close to expiry.
    /// A refused refresh clears the session.
    pub async fn get_session(&self) -> PortResult<Option<ProviderSession>> {
        let Some(session) = self.session.lock().await.clone() else {
            return Ok(None);
        };
        let now = Utc::now();
        if !session.needs_refresh(now, self.refresh_margin) {
            return Ok(Some(session));
        }

        match self.refresh().await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(PortError::Unauthorized) => Ok(None),
            // Still usable for a little while; the next call retries.
            Err(e) if session.expires_at > now => {
                warn!(error = %e, "Session refresh failed; using the current token until it expires");
                Ok(Some(session))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> PortResult<ProviderSession> {
        let session = self.provider.sign_in_with_password(email, password).await?;
        self.store(session.clone()).await;
        Ok(session)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> PortResult<SignUpOutcome> {
        let outcome = self.provider.sign_up(email, password, metadata).await?;
        if let SignUpOutcome::SignedIn(session) = &outcome {
            self.store(session.clone()).await;
        }
        Ok(outcome)
    }

    /// Starts a federated sign-in and returns the URL to send the browser to.
    pub async fn sign_in_with_oauth(&self, provider: &str, redirect_to: &str) -> PortResult<String> {
        let request = self.provider.authorize_url(provider, redirect_to)?;
        *self.pending_verifier.lock().await = Some(request.code_verifier);
        debug!(provider, "Federated sign-in started");
        Ok(request.url)
    }

    /// Completes a federated sign-in with the authorization code from the callback.
    pub async fn exchange_code_for_session(&self, code: &str) -> PortResult<ProviderSession> {
        let verifier = self
            .pending_verifier
            .lock()
            .await
            .take()
            .ok_or_else(|| PortError::Rejected("No sign-in is in progress. Please try again.".to_string()))?;
        let session = self.provider.exchange_code(code, &verifier).await?;
        self.store(session.clone()).await;
        Ok(session)
    }

    /// Exchanges the refresh token for a new session.
    pub async fn refresh(&self) -> PortResult<ProviderSession> {
        let refresh_token = self
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(PortError::Unauthorized)?;

        match self.provider.refresh_session(&refresh_token).await {
            Ok(refreshed) => {
                let mut guard = self.session.lock().await;
                // Signed out or replaced while the call was in flight.
                if guard.as_ref().map(|s| s.refresh_token.as_str()) != Some(refresh_token.as_str()) {
                    return Err(PortError::Unauthorized);
                }
                *guard = Some(refreshed.clone());
                self.emit(AuthEvent::TokenRefreshed(refreshed.user.clone()));
                drop(guard);
                self.session_changed.notify_one();
                Ok(refreshed)
            }
            Err(PortError::Unauthorized) => {
                let mut guard = self.session.lock().await;
                if guard.as_ref().map(|s| s.refresh_token.as_str()) == Some(refresh_token.as_str()) {
                    info!("Refresh token was refused; clearing the session");
                    guard.take();
                    self.emit(AuthEvent::SignedOut);
                    drop(guard);
                    self.session_changed.notify_one();
                }
                Err(PortError::Unauthorized)
            }
            Err(e) => Err(e),
        }
    }

    /// Clears the local session and notifies subscribers, then revokes the
    /// session remotely. The local state is cleared even when revocation fails.
    pub async fn sign_out(&self) -> PortResult<()> {
        let previous = self.clear().await;
        match previous {
            Some(session) => self.provider.sign_out(&session.access_token).await,
            None => Ok(()),
        }
    }

    /// Keeps the session fresh in the background until `cancel` fires.
    pub fn spawn_auto_refresh(self: &Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let client = Arc::clone(self);
        tokio::spawn(async move { client.auto_refresh_loop(cancel).await })
    }

    async fn auto_refresh_loop(&self, cancel: CancellationToken) {
        loop {
            let wait = self.time_until_refresh().await;
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.session_changed.notified() => continue,
                _ = sleep_or_wait_forever(wait) => {}
            }

            match self.refresh().await {
                Ok(_) => debug!("Session refreshed in the background"),
                Err(PortError::Unauthorized) => {}
                Err(e) => {
                    warn!(error = %e, "Background session refresh failed");
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(REFRESH_RETRY_DELAY) => {}
                    }
                }
            }
        }
        debug!("Auto-refresh stopped");
    }

    async fn time_until_refresh(&self) -> Option<std::time::Duration> {
        let guard = self.session.lock().await;
        let session = guard.as_ref()?;
        let due = session.expires_at - self.refresh_margin - Utc::now();
        Some(due.to_std().unwrap_or(std::time::Duration::ZERO))
    }

    /// Stores a new session and announces the sign-in.
    async fn store(&self, session: ProviderSession) {
        let mut guard = self.session.lock().await;
        let user = session.user.clone();
        *guard = Some(session);
        self.emit(AuthEvent::SignedIn(user));
        drop(guard);
        self.session_changed.notify_one();
    }

    async fn clear(&self) -> Option<ProviderSession> {
        let mut guard = self.session.lock().await;
        let previous = guard.take();
        self.emit(AuthEvent::SignedOut);
        drop(guard);
        self.session_changed.notify_one();
        previous
    }

    /// Callers hold the session lock, so events go out in the order the session changed.
    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine; the session itself is the source of truth.
        let _ = self.events.send(event);
    }
}

async fn sleep_or_wait_forever(wait: Option<std::time::Duration>) {
    match wait {
        Some(duration) => tokio::time::sleep(duration).await,
        None => std::future::pending::<()>().await,
    }
}
