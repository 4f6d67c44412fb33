//! services/web/src/adapters/gotrue.rs
//!
//! This module contains the hosted identity adapter, a concrete implementation
//! of the `IdentityProvider` port that talks to a GoTrue-compatible REST
//! service over HTTPS using `reqwest`.

use crate::adapters::pkce;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use paypeek_core::domain::{ProviderSession, User, UserMetadata};
use paypeek_core::ports::{
    AuthorizationRequest, IdentityProvider, PortError, PortResult, SignUpOutcome,
};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter for a hosted GoTrue-compatible identity service.
#[derive(Clone)]
pub struct GoTrueAdapter {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
}

impl GoTrueAdapter {
    /// Creates a new `GoTrueAdapter`.
    ///
    /// # Arguments
    /// * `base_url` - Project URL, e.g. `https://<project>.supabase.co`.
    /// * `anon_key` - The public API key sent as the `apikey` header.
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn token(&self, grant_type: &str, body: serde_json::Value) -> PortResult<ProviderSession> {
        let request = self
            .http
            .post(self.endpoint("token"))
            .query(&[("grant_type", grant_type)])
            .json(&body);
        let raw = self.send(request).await?;
        decode::<SessionRecord>(&raw)?.to_domain()
    }

    /// Sends the request with the project key and returns the body of a successful response.
    async fn send(&self, request: RequestBuilder) -> PortResult<String> {
        let response = request
            .header("apikey", &self.anon_key)
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;

        if status.is_success() {
            Ok(body)
        } else {
            Err(map_error(status, &body))
        }
    }
}

//=========================================================================================
// "Impure" Wire Record Structs
//=========================================================================================

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct SessionRecord {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: UserRecord,
}
impl SessionRecord {
    fn to_domain(self) -> PortResult<ProviderSession> {
        let expires_at = self
            .expires_at
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(|| expires_in(self.expires_in));
        Ok(ProviderSession {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            user: self.user.to_domain()?,
        })
    }
}

fn expires_in(seconds: Option<i64>) -> DateTime<Utc> {
    Utc::now() + Duration::seconds(seconds.unwrap_or(DEFAULT_EXPIRES_IN_SECS))
}

#[derive(Deserialize)]
struct UserRecord {
    id: Option<String>,
    email: Option<String>,
    #[serde(default)]
    user_metadata: MetadataRecord,
}
impl UserRecord {
    /// Rejects users the rest of the system could not work with.
    fn to_domain(self) -> PortResult<User> {
        let id = self
            .id
            .as_deref()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| PortError::Malformed("user id is missing or not a UUID".to_string()))?;
        let email = self
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| PortError::Malformed("user has no e-mail address".to_string()))?;
        let metadata = self.user_metadata;
        Ok(User {
            id,
            email,
            display_name: metadata.display_name.or(metadata.full_name).or(metadata.name),
            avatar_url: metadata.avatar_url.or(metadata.picture),
        })
    }
}

#[derive(Deserialize, Default)]
struct MetadataRecord {
    display_name: Option<String>,
    full_name: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
    picture: Option<String>,
}

/// Sign-up answers with a session when confirmation is off, and with the bare user otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpRecord {
    Session(SessionRecord),
    User(UserRecord),
}

#[derive(Deserialize, Default)]
struct ErrorRecord {
    error: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}
impl ErrorRecord {
    fn message(&self) -> Option<&str> {
        self.error_description
            .as_deref()
            .or(self.msg.as_deref())
            .or(self.message.as_deref())
            .or(self.error.as_deref())
    }
}

fn decode<T: for<'de> Deserialize<'de>>(raw: &str) -> PortResult<T> {
    serde_json::from_str(raw).map_err(|e| PortError::Malformed(e.to_string()))
}

fn map_error(status: StatusCode, body: &str) -> PortError {
    let record: ErrorRecord = serde_json::from_str(body).unwrap_or_default();
    let message = record.message().map(str::to_string);
    debug!(%status, ?message, "Identity provider returned an error");

    let bad_credentials = record.error.as_deref() == Some("invalid_grant")
        || message
            .as_deref()
            .is_some_and(|m| m.to_lowercase().contains("invalid login credentials"));

    match status {
        StatusCode::UNAUTHORIZED => PortError::Unauthorized,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY if bad_credentials => {
            PortError::Unauthorized
        }
        StatusCode::NOT_FOUND => PortError::NotFound(message.unwrap_or_else(|| "not found".to_string())),
        s if s.is_client_error() => match message {
            Some(message) => PortError::Rejected(message),
            None => PortError::Unexpected(format!("identity provider answered {s}")),
        },
        s => PortError::Unexpected(format!(
            "identity provider answered {s}: {}",
            message.unwrap_or_default()
        )),
    }
}

//=========================================================================================
// Port Implementation
//=========================================================================================

#[async_trait]
impl IdentityProvider for GoTrueAdapter {
    async fn sign_in_with_password(&self, email: &str, password: &str) -> PortResult<ProviderSession> {
        let body = serde_json::to_value(PasswordGrant { email, password })
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        self.token("password", body).await
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> PortResult<SignUpOutcome> {
        let request = self.http.post(self.endpoint("signup")).json(&json!({
            "email": email,
            "password": password,
            "data": {
                "display_name": metadata.display_name,
                "avatar_url": metadata.avatar_url,
            },
        }));
        let raw = self.send(request).await?;
        match decode::<SignUpRecord>(&raw)? {
            SignUpRecord::Session(session) => Ok(SignUpOutcome::SignedIn(session.to_domain()?)),
            SignUpRecord::User(user) => Ok(SignUpOutcome::ConfirmationRequired(user.to_domain()?)),
        }
    }

    fn authorize_url(&self, provider: &str, redirect_to: &str) -> PortResult<AuthorizationRequest> {
        let code_verifier = pkce::code_verifier();
        let challenge = pkce::code_challenge(&code_verifier);
        let url = Url::parse_with_params(
            &self.endpoint("authorize"),
            &[
                ("provider", provider),
                ("redirect_to", redirect_to),
                ("code_challenge", challenge.as_str()),
                ("code_challenge_method", "s256"),
            ],
        )
        .map_err(|e| PortError::Malformed(e.to_string()))?;
        Ok(AuthorizationRequest {
            url: url.into(),
            code_verifier,
        })
    }

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> PortResult<ProviderSession> {
        self.token(
            "pkce",
            json!({ "auth_code": code, "code_verifier": code_verifier }),
        )
        .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> PortResult<ProviderSession> {
        self.token("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> PortResult<()> {
        let request = self
            .http
            .post(self.endpoint("logout"))
            .bearer_auth(access_token);
        match self.send(request).await {
            Ok(_) => Ok(()),
            // Already revoked or expired: nothing left to sign out of.
            Err(PortError::Unauthorized) | Err(PortError::NotFound(_)) => {
                warn!("Access token was already invalid at sign-out");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
