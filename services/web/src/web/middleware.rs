//! services/web/src/web/middleware.rs
//!
//! Middleware that binds each request to its browser's workspace, and the
//! guard protecting the JSON API.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};
use paypeek_core::GuardState;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::web::protocol::{failure, HandlerError};
use crate::web::state::{AppState, Workspace};

/// Name of the cookie that identifies a browser's workspace.
pub const CLIENT_COOKIE: &str = "pp_client";

/// Middleware that resolves the `pp_client` cookie to a workspace.
///
/// The workspace is inserted into request extensions for handlers to use.
/// A browser without a known workspace gets a new one and a fresh cookie, but
/// only on the pages and auth endpoints; any other request goes on without one.
pub async fn attach_workspace(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let client_id = cookie_value(req.headers(), CLIENT_COOKIE).and_then(|v| Uuid::parse_str(v).ok());
    let known = match client_id {
        Some(id) => state.workspaces.get(id).await,
        None => None,
    };
    let (workspace, created) = match known {
        Some(workspace) => (workspace, false),
        None if opens_workspace(req.uri().path()) => (state.workspaces.open().await, true),
        None => return next.run(req).await,
    };
    let workspace_id = workspace.id;
    req.extensions_mut().insert(workspace);

    let mut response = next.run(req).await;
    if created {
        debug!(workspace = %workspace_id, "Issuing client cookie");
        let cookie = format!("{CLIENT_COOKIE}={workspace_id}; HttpOnly; SameSite=Lax; Path=/");
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => error!("Failed to build client cookie: {:?}", e),
        }
    }
    response
}

fn opens_workspace(path: &str) -> bool {
    matches!(path, "/" | "/dashboard" | "/api/session")
        || path.starts_with("/auth/")
        || path.starts_with("/api/auth/")
}

/// Middleware for the protected JSON API: waits for the session restore,
/// then answers 401 unless the workspace is signed in.
pub async fn require_session(req: Request, next: Next) -> Result<Response, HandlerError> {
    let Some(workspace) = req.extensions().get::<Arc<Workspace>>().cloned() else {
        return Err(failure(StatusCode::UNAUTHORIZED, "Authentication required"));
    };
    let snapshot = workspace.session.resolved().await;
    if GuardState::from(&snapshot) != GuardState::Unlocked {
        return Err(failure(StatusCode::UNAUTHORIZED, "Authentication required"));
    }
    Ok(next.run(req).await)
}

/// Extracts one cookie from the `Cookie` header.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|pair| {
            let (key, value) = pair.trim().split_once('=')?;
            (key == name).then_some(value)
        })
}
