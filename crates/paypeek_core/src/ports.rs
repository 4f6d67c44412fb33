//! crates/paypeek_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! The identity provider is the only external collaborator; everything else
//! in the core is in-memory.

use async_trait::async_trait;
use crate::domain::{ProviderSession, User, UserMetadata};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, JSON).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Bad credentials, or a token the provider no longer accepts.
    #[error("Unauthorized")]
    Unauthorized,
    /// The provider refused the request and explained why.
    #[error("Rejected by provider: {0}")]
    Rejected(String),
    #[error("Network failure: {0}")]
    Network(String),
    /// The provider answered with a payload that does not describe a valid record.
    #[error("Malformed provider payload: {0}")]
    Malformed(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Identity Provider Port
//=========================================================================================

/// Result of a sign-up call. Providers that require e-mail confirmation
/// create the identity without issuing a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(ProviderSession),
    ConfirmationRequired(User),
}

/// Where to send the browser for a federated sign-in, plus the PKCE verifier
/// that must be presented when the authorization code comes back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub url: String,
    pub code_verifier: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> PortResult<ProviderSession>;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: &UserMetadata,
    ) -> PortResult<SignUpOutcome>;

    /// Builds the redirect for a federated (OAuth) sign-in. No network call.
    fn authorize_url(&self, provider: &str, redirect_to: &str) -> PortResult<AuthorizationRequest>;

    async fn exchange_code(&self, code: &str, code_verifier: &str) -> PortResult<ProviderSession>;

    async fn refresh_session(&self, refresh_token: &str) -> PortResult<ProviderSession>;

    async fn sign_out(&self, access_token: &str) -> PortResult<()>;
}
