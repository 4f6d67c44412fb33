//! services/web/src/bin/web.rs

use paypeek_core::ports::IdentityProvider;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use web_lib::{
    adapters::{memory::DEMO_EMAIL, GoTrueAdapter, MemoryIdentityProvider},
    config::{AuthProviderKind, Config},
    error::ApiError,
    web::{router, state::AppState},
};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize the Identity Provider ---
    let identity: Arc<dyn IdentityProvider> = match config.auth_provider {
        AuthProviderKind::Memory => {
            info!(demo_account = DEMO_EMAIL, "Using the in-memory identity provider");
            Arc::new(MemoryIdentityProvider::new().with_demo_account()?)
        }
        AuthProviderKind::GoTrue => {
            let (Some(url), Some(key)) = (config.auth_url.as_ref(), config.auth_anon_key.as_ref()) else {
                return Err(ApiError::Internal("AUTH_URL and AUTH_ANON_KEY are required".to_string()));
            };
            info!(auth_url = %url, "Using the hosted identity provider");
            Arc::new(GoTrueAdapter::new(url.clone(), key.clone()))
        }
    };

    // --- 3. Build the Shared AppState ---
    let state = Arc::new(AppState::new(config.clone(), identity)?);
    let sweeper_cancel = CancellationToken::new();
    let sweeper = state
        .workspaces
        .spawn_sweeper(config.workspace_idle, sweeper_cancel.clone());

    // --- 4. Create the Web Router ---
    let app = router(state.clone())?;

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", config.bind_address);
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- 6. Tear Down Workspaces ---
    sweeper_cancel.cancel();
    if let Err(e) = sweeper.await {
        warn!("Workspace sweeper ended abnormally: {:?}", e);
    }
    state.workspaces.close_all().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for the shutdown signal: {:?}", e);
    }
}
