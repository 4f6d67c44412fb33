//! services/web/src/adapters/memory.rs
//!
//! An in-process implementation of the `IdentityProvider` port for local demos
//! and tests. Passwords are hashed with Argon2; tokens are opaque random strings.
//! The federated flow is simulated: the "consent screen" redirects straight back
//! to the callback with a one-time code bound to the PKCE challenge.

use crate::adapters::pkce;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use paypeek_core::domain::{ProviderSession, User, UserMetadata};
use paypeek_core::ports::{
    AuthorizationRequest, IdentityProvider, PortError, PortResult, SignUpOutcome,
};
use reqwest::Url;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, error, info};
use uuid::Uuid;

pub const DEMO_EMAIL: &str = "demo@paypeek.com";
pub const DEMO_PASSWORD: &str = "PayPeek123";

const TOKEN_TTL_SECS: i64 = 3600;

struct Account {
    user: User,
    password_hash: String,
}

struct IssuedSession {
    user_id: Uuid,
    access_token: String,
}

struct PendingGrant {
    provider: String,
    code_challenge: String,
}

#[derive(Default)]
struct Directory {
    /// Keyed by lower-cased e-mail.
    accounts: HashMap<String, Account>,
    /// Keyed by refresh token.
    sessions: HashMap<String, IssuedSession>,
    /// Keyed by one-time authorization code.
    grants: HashMap<String, PendingGrant>,
}

impl Directory {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.accounts.values().map(|a| &a.user).find(|u| u.id == id)
    }

    fn issue(&mut self, user: User) -> ProviderSession {
        let access_token = opaque_token();
        let refresh_token = opaque_token();
        self.sessions.insert(
            refresh_token.clone(),
            IssuedSession {
                user_id: user.id,
                access_token: access_token.clone(),
            },
        );
        ProviderSession {
            access_token,
            refresh_token,
            expires_at: Utc::now() + Duration::seconds(TOKEN_TTL_SECS),
            user,
        }
    }
}

fn opaque_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Default)]
pub struct MemoryIdentityProvider {
    directory: Mutex<Directory>,
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account directly, bypassing the sign-up policy.
    pub fn register(&self, email: &str, password: &str, display_name: Option<&str>) -> PortResult<User> {
        let password_hash = hash_password(password)?;
        self.insert_account(email, password_hash, display_name)
    }

    fn insert_account(&self, email: &str, password_hash: String, display_name: Option<&str>) -> PortResult<User> {
        let mut directory = self.lock()?;
        let key = email.trim().to_lowercase();
        if directory.accounts.contains_key(&key) {
            return Err(PortError::Rejected("User already registered".to_string()));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.trim().to_string(),
            display_name: display_name.map(str::to_string),
            avatar_url: None,
        };
        directory.accounts.insert(
            key,
            Account {
                user: user.clone(),
                password_hash,
            },
        );
        debug!(user_id = %user.id, "Registered in-memory account");
        Ok(user)
    }

    /// Seeds the well-known demo account.
    pub fn with_demo_account(self) -> PortResult<Self> {
        self.register(DEMO_EMAIL, DEMO_PASSWORD, Some("Demo Creator"))?;
        info!(email = DEMO_EMAIL, "Demo account available");
        Ok(self)
    }

    fn lock(&self) -> PortResult<MutexGuard<'_, Directory>> {
        self.directory
            .lock()
            .map_err(|_| PortError::Unexpected("identity directory lock poisoned".to_string()))
    }

    /// The account a federated identity signs in as, created on first use.
    fn federated_user(directory: &mut Directory, provider: &str) -> PortResult<User> {
        let email = format!("demo+{}@paypeek.com", provider.to_lowercase());
        if let Some(account) = directory.accounts.get(&email) {
            return Ok(account.user.clone());
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.clone(),
            display_name: Some(format!("{} Demo", capitalize(provider))),
            avatar_url: None,
        };
        directory.accounts.insert(
            email,
            Account {
                user: user.clone(),
                // Federated identities have no usable password.
                password_hash: String::new(),
            },
        );
        Ok(user)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn hash_password(password: &str) -> PortResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            PortError::Unexpected("Failed to hash password".to_string())
        })
}

fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Runs an Argon2 job on the blocking pool; hashing must not stall the executor.
async fn off_runtime<T, F>(job: F) -> PortResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(job).await.map_err(|e| {
        error!("Password task failed: {:?}", e);
        PortError::Unexpected("Password check failed".to_string())
    })
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> PortResult<ProviderSession> {
        let (user, stored) = {
            let directory = self.lock()?;
            let account = directory
                .accounts
                .get(&email.trim().to_lowercase())
                .ok_or(PortError::Unauthorized)?;
            (account.user.clone(), account.password_hash.clone())
        };

        let password = password.to_string();
        if !off_runtime(move || verify_password(&password, &stored)).await? {
            return Err(PortError::Unauthorized);
        }
        Ok(self.lock()?.issue(user))
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> PortResult<SignUpOutcome> {
        let plain = password.to_string();
        let password_hash = off_runtime(move || hash_password(&plain)).await??;
        let mut user = self.insert_account(email, password_hash, metadata.display_name.as_deref())?;
        user.avatar_url = metadata.avatar_url.clone();

        let mut directory = self.lock()?;
        if let Some(account) = directory.accounts.get_mut(&user.email.to_lowercase()) {
            account.user.avatar_url = user.avatar_url.clone();
        }
        Ok(SignUpOutcome::SignedIn(directory.issue(user)))
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str) -> PortResult<AuthorizationRequest> {
        let code_verifier = pkce::code_verifier();
        let code = Uuid::new_v4().simple().to_string();
        let url = Url::parse_with_params(redirect_to, &[("code", code.as_str())])
            .map_err(|e| PortError::Malformed(format!("redirect target: {e}")))?;

        self.lock()?.grants.insert(
            code,
            PendingGrant {
                provider: provider.to_string(),
                code_challenge: pkce::code_challenge(&code_verifier),
            },
        );
        Ok(AuthorizationRequest {
            url: url.into(),
            code_verifier,
        })
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> PortResult<ProviderSession> {
        let mut directory = self.lock()?;
        let grant = directory.grants.remove(code).ok_or(PortError::Unauthorized)?;
        if grant.code_challenge != pkce::code_challenge(code_verifier) {
            return Err(PortError::Unauthorized);
        }
        let user = Self::federated_user(&mut directory, &grant.provider)?;
        Ok(directory.issue(user))
    }

    async fn refresh_session(&self, refresh_token: &str) -> PortResult<ProviderSession> {
        let mut directory = self.lock()?;
        // Refresh tokens rotate: the old one is spent either way.
        let issued = directory
            .sessions
            .remove(refresh_token)
            .ok_or(PortError::Unauthorized)?;
        let user = directory
            .user(issued.user_id)
            .cloned()
            .ok_or(PortError::Unauthorized)?;
        Ok(directory.issue(user))
    }

    async fn sign_out(&self, access_token: &str) -> PortResult<()> {
        self.lock()?
            .sessions
            .retain(|_, issued| issued.access_token != access_token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn password_round_trip() {
        let provider = MemoryIdentityProvider::new().with_demo_account().unwrap();

        let session = provider
            .sign_in_with_password("Demo@PayPeek.com", DEMO_PASSWORD)
            .await
            .unwrap();
        assert_eq!(session.user.email, DEMO_EMAIL);
        assert_eq!(session.user.display_name.as_deref(), Some("Demo Creator"));

        let wrong = provider.sign_in_with_password(DEMO_EMAIL, "nope").await;
        assert_eq!(wrong.unwrap_err(), PortError::Unauthorized);
        let unknown = provider.sign_in_with_password("ghost@example.com", "x").await;
        assert_eq!(unknown.unwrap_err(), PortError::Unauthorized);
    }

    #[tokio::test]
    async fn password_check_does_not_hold_the_directory() {
        let provider = std::sync::Arc::new(MemoryIdentityProvider::new().with_demo_account().unwrap());

        let signing_in = tokio::spawn({
            let provider = provider.clone();
            async move { provider.sign_in_with_password(DEMO_EMAIL, DEMO_PASSWORD).await }
        });
        tokio::task::yield_now().await;

        // The sign-in is parked on the blocking pool with the directory unlocked.
        assert!(!signing_in.is_finished());
        assert!(provider.directory.try_lock().is_ok());
        provider.register("other@example.com", "Secret123", None).unwrap();

        let session = signing_in.await.unwrap().unwrap();
        assert_eq!(session.user.email, DEMO_EMAIL);
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected() {
        let provider = MemoryIdentityProvider::new();
        let metadata = UserMetadata {
            display_name: Some("Sam".into()),
            avatar_url: None,
        };
        let outcome = provider.sign_up("sam@example.com", "Secret123", &metadata).await.unwrap();
        assert!(matches!(outcome, SignUpOutcome::SignedIn(ref s) if s.user.display_name.as_deref() == Some("Sam")));

        let again = provider.sign_up("SAM@example.com", "Secret123", &metadata).await;
        assert_eq!(
            again.unwrap_err(),
            PortError::Rejected("User already registered".to_string())
        );
    }

    #[tokio::test]
    async fn refresh_tokens_rotate_and_die_on_sign_out() {
        let provider = MemoryIdentityProvider::new().with_demo_account().unwrap();
        let first = provider.sign_in_with_password(DEMO_EMAIL, DEMO_PASSWORD).await.unwrap();

        let second = provider.refresh_session(&first.refresh_token).await.unwrap();
        assert_eq!(second.user, first.user);
        assert_eq!(
            provider.refresh_session(&first.refresh_token).await.unwrap_err(),
            PortError::Unauthorized
        );

        provider.sign_out(&second.access_token).await.unwrap();
        assert_eq!(
            provider.refresh_session(&second.refresh_token).await.unwrap_err(),
            PortError::Unauthorized
        );
    }

    #[tokio::test]
    async fn federated_code_is_bound_to_the_verifier() {
        let provider = MemoryIdentityProvider::new();
        let request = provider
            .authorize_url("google", "http://localhost:3000/auth/callback")
            .unwrap();
        let url = Url::parse(&request.url).unwrap();
        assert_eq!(url.path(), "/auth/callback");
        let code = url
            .query_pairs()
            .find(|(k, _)| k == "code")
            .map(|(_, v)| v.into_owned())
            .unwrap();

        assert_eq!(
            provider.exchange_code(&code, "wrong-verifier").await.unwrap_err(),
            PortError::Unauthorized
        );

        let request = provider
            .authorize_url("google", "http://localhost:3000/auth/callback")
            .unwrap();
        let url = Url::parse(&request.url).unwrap();
        let code = url.query_pairs().find(|(k, _)| k == "code").unwrap().1.into_owned();
        let session = provider.exchange_code(&code, &request.code_verifier).await.unwrap();
        assert_eq!(session.user.email, "demo+google@paypeek.com");
        assert_eq!(session.user.display_name.as_deref(), Some("Google Demo"));
    }
}
