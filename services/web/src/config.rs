//! services/web/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which identity provider backs the auth client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthProviderKind {
    /// In-process accounts, for local demos and tests.
    Memory,
    /// A hosted GoTrue-compatible service.
    GoTrue,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub auth_provider: AuthProviderKind,
    pub auth_url: Option<String>,
    pub auth_anon_key: Option<String>,
    /// Public origin of this site; used for OAuth redirects and CORS.
    pub site_url: String,
    pub share_base_url: String,
    pub oauth_provider: String,
    pub success_delay: Duration,
    pub workspace_idle: Duration,
    /// Upper bound on live browser workspaces; the longest idle is evicted first.
    pub max_workspaces: usize,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        // --- Server Settings ---
        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Identity Provider ---
        let auth_url = var("AUTH_URL").map(|url| url.trim_end_matches('/').to_string());
        let auth_anon_key = var("AUTH_ANON_KEY");
        let auth_provider = match var("AUTH_PROVIDER").map(|v| v.to_lowercase()) {
            Some(kind) if kind == "memory" => AuthProviderKind::Memory,
            Some(kind) if kind == "gotrue" => AuthProviderKind::GoTrue,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    "AUTH_PROVIDER".to_string(),
                    format!("'{}' is not one of memory, gotrue", other),
                ))
            }
            None if auth_url.is_some() => AuthProviderKind::GoTrue,
            None => AuthProviderKind::Memory,
        };
        if auth_provider == AuthProviderKind::GoTrue {
            if auth_url.is_none() {
                return Err(ConfigError::MissingVar("AUTH_URL".to_string()));
            }
            if auth_anon_key.is_none() {
                return Err(ConfigError::MissingVar("AUTH_ANON_KEY".to_string()));
            }
        }

        // --- Site Settings ---
        let site_url = var("SITE_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();
        let share_base_url = var("SHARE_BASE_URL")
            .unwrap_or_else(|| "https://paypeek.com".to_string())
            .trim_end_matches('/')
            .to_string();
        let oauth_provider = var("OAUTH_PROVIDER").unwrap_or_else(|| "google".to_string());

        let success_delay = Duration::from_millis(parse_number(&var, "AUTH_SUCCESS_DELAY_MS", 1500)?);
        let workspace_idle = Duration::from_secs(parse_number(&var, "WORKSPACE_IDLE_SECS", 3600)?);
        let max_workspaces = parse_number(&var, "MAX_WORKSPACES", 10_000)?.max(1) as usize;

        Ok(Self {
            bind_address,
            log_level,
            auth_provider,
            auth_url,
            auth_anon_key,
            site_url,
            share_base_url,
            oauth_provider,
            success_delay,
            workspace_idle,
            max_workspaces,
        })
    }

    /// Where the federated provider sends the browser back to.
    pub fn oauth_callback_url(&self) -> String {
        format!("{}/auth/callback", self.site_url)
    }
}

fn parse_number<F>(var: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("'{}' is not a whole number", raw))
        }),
        None => Ok(default),
    }
}
