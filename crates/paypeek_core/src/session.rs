//! crates/paypeek_core/src/session.rs
//!
//! The session store: the live authentication state of one browser, derived
//! from the `AuthClient` and published to observers through a watch channel.

use crate::auth::{validate_email, validate_password, AuthError, SignInForm, ValidationError};
use crate::auth_client::{AuthClient, AuthEvent};
use crate::domain::{User, UserMetadata};
use crate::ports::{PortError, SignUpOutcome};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How long `just_authenticated` stays set after a successful sign-in or sign-up.
pub const DEFAULT_SUCCESS_DELAY: Duration = Duration::from_millis(1500);

/// What observers of the session see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    /// True only while the initial session restore is running.
    pub loading: bool,
    /// Set after an explicit sign-in or sign-up, cleared after the success delay.
    pub just_authenticated: bool,
}

impl SessionSnapshot {
    fn restoring() -> Self {
        Self {
            user: None,
            loading: true,
            just_authenticated: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpResult {
    SignedIn(User),
    /// The identity exists but must be confirmed by e-mail before signing in.
    ConfirmationRequired { email: String },
}

pub struct SessionStore {
    client: Arc<AuthClient>,
    state: Arc<watch::Sender<SessionSnapshot>>,
    success_delay: Duration,
    lifecycle: CancellationToken,
    flag_timer: Mutex<Option<CancellationToken>>,
}

impl SessionStore {
    pub fn new(client: Arc<AuthClient>, success_delay: Duration) -> Arc<Self> {
        let (state, _) = watch::channel(SessionSnapshot::restoring());
        Arc::new(Self {
            client,
            state: Arc::new(state),
            success_delay,
            lifecycle: CancellationToken::new(),
            flag_timer: Mutex::new(None),
        })
    }

    /// Subscribes to provider session changes for the lifetime of the store,
    /// then restores the persisted session and leaves the loading state.
    pub async fn init(self: &Arc<Self>) {
        let events = self.client.subscribe();
        tokio::spawn(listen(Arc::downgrade(self), events, self.lifecycle.clone()));

        if let Err(e) = self.client.get_session().await {
            warn!(error = %e, "Could not restore the previous session");
        }
        // Read back rather than using the restore result: an event may have landed meanwhile.
        let user = self.client.current_user().await;
        self.state.send_modify(|s| {
            s.user = user;
            s.loading = false;
        });
        debug!("Session restore finished");
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// Waits for the initial restore to finish and returns the resulting state.
    pub async fn resolved(&self) -> SessionSnapshot {
        let mut rx = self.state.subscribe();
        let resolved = match rx.wait_for(|s| !s.loading).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        resolved
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, AuthError> {
        SignInForm {
            email: email.to_string(),
            password: password.to_string(),
        }
        .validate()?;

        let session = self
            .client
            .sign_in_with_password(email.trim(), password)
            .await
            .map_err(report)?;

        if self.discard_after_teardown("sign-in") {
            return Ok(session.user);
        }
        self.set_user(Some(session.user.clone()));
        self.mark_authenticated().await;
        info!(user_id = %session.user.id, "Signed in with password");
        Ok(session.user)
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<SignUpResult, AuthError> {
        if display_name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
            return Err(ValidationError::MissingFields.into());
        }
        validate_email(email)?;
        validate_password(password)?;

        let metadata = UserMetadata {
            display_name: Some(display_name.trim().to_string()),
            avatar_url: None,
        };
        let outcome = self
            .client
            .sign_up(email.trim(), password, &metadata)
            .await
            .map_err(report)?;

        match outcome {
            SignUpOutcome::SignedIn(session) => {
                if !self.discard_after_teardown("sign-up") {
                    self.set_user(Some(session.user.clone()));
                    self.mark_authenticated().await;
                    info!(user_id = %session.user.id, "Signed up and signed in");
                }
                Ok(SignUpResult::SignedIn(session.user))
            }
            SignUpOutcome::ConfirmationRequired(user) => {
                info!(user_id = %user.id, "Signed up; waiting for e-mail confirmation");
                Ok(SignUpResult::ConfirmationRequired { email: user.email })
            }
        }
    }

    /// Returns the provider URL the browser must be sent to. The user arrives
    /// back on a separate page load, handled by [`SessionStore::complete_federated`].
    pub async fn sign_in_federated(&self, provider: &str, redirect_to: &str) -> Result<String, AuthError> {
        self.client
            .sign_in_with_oauth(provider, redirect_to)
            .await
            .map_err(report)
    }

    pub async fn complete_federated(&self, code: &str) -> Result<User, AuthError> {
        let session = self
            .client
            .exchange_code_for_session(code)
            .await
            .map_err(report)?;

        if self.discard_after_teardown("federated sign-in") {
            return Ok(session.user);
        }
        self.set_user(Some(session.user.clone()));
        self.mark_authenticated().await;
        info!(user_id = %session.user.id, "Signed in through the federated provider");
        Ok(session.user)
    }

    /// Best effort: the local session is always cleared, remote failures are only logged.
    pub async fn sign_out(&self) {
        if let Err(e) = self.client.sign_out().await {
            warn!(error = %e, "Remote sign-out failed; local session cleared anyway");
        }
        if let Some(timer) = self.flag_timer.lock().await.take() {
            timer.cancel();
        }
        self.set_user(None);
        info!("Signed out");
    }

    /// Releases the event subscription and cancels pending timers.
    pub fn teardown(&self) {
        self.lifecycle.cancel();
        debug!("Session store torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.lifecycle.is_cancelled()
    }

    /// Idempotent: applying the same user twice publishes nothing the second time.
    fn set_user(&self, user: Option<User>) {
        self.state.send_if_modified(|s| {
            if s.user == user {
                return false;
            }
            if user.is_none() {
                s.just_authenticated = false;
            }
            s.user = user;
            true
        });
    }

    async fn mark_authenticated(&self) {
        let timer = self.lifecycle.child_token();
        if let Some(previous) = self.flag_timer.lock().await.replace(timer.clone()) {
            previous.cancel();
        }
        self.state.send_modify(|s| s.just_authenticated = true);

        let state = Arc::clone(&self.state);
        let delay = self.success_delay;
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = timer.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    state.send_if_modified(|s| {
                        if timer.is_cancelled() || !s.just_authenticated {
                            return false;
                        }
                        s.just_authenticated = false;
                        true
                    });
                }
            }
        });
    }

    fn discard_after_teardown(&self, operation: &str) -> bool {
        let torn_down = self.is_torn_down();
        if torn_down {
            debug!(operation, "Discarding auth result that arrived after teardown");
        }
        torn_down
    }
}

async fn listen(
    store: Weak<SessionStore>,
    mut events: broadcast::Receiver<AuthEvent>,
    cancel: CancellationToken,
) {
    loop {
        let received = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = events.recv() => received,
        };
        let Some(store) = store.upgrade() else { break };

        match received {
            Ok(event) => {
                debug!(?event, "Session change notification");
                store.set_user(event.user().cloned());
            }
            Err(RecvError::Lagged(skipped)) => {
                // Latest state wins: skip the backlog and read the current user.
                debug!(skipped, "Session listener lagged; resynchronising");
                let user = store.client.current_user().await;
                store.set_user(user);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn report(err: PortError) -> AuthError {
    let auth_error = AuthError::from(err);
    match &auth_error {
        AuthError::Unexpected(detail) => error!(detail = %detail, "Unexpected authentication failure"),
        AuthError::NetworkFailure(detail) => warn!(detail = %detail, "Identity provider unreachable"),
        other => debug!(error = %other, "Authentication rejected"),
    }
    auth_error
}
