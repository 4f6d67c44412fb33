//! services/web/src/web/auth.rs
//!
//! Authentication endpoints: password sign-in and sign-up, sign-out, and the
//! redirect-based federated sign-in.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect},
    Extension, Json,
};
use paypeek_core::{SignUpForm, SignUpResult};
use reqwest::Url;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::web::protocol::{
    auth_failure, json_body, ErrorResponse, HandlerError, SessionResponse, SignInRequest,
    SignUpRequest, SignUpResponse, UserResponse,
};
use crate::web::state::{AppState, Workspace};

const CONFIRM_EMAIL_MESSAGE: &str = "Please check your email to confirm your account.";

//=========================================================================================
// JSON Handlers
//=========================================================================================

/// POST /api/auth/sign-in - Sign in with e-mail and password
#[utoipa::path(
    post,
    path = "/api/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 400, description = "Missing fields", body = ErrorResponse),
        (status = 401, description = "Invalid email or password", body = ErrorResponse),
        (status = 503, description = "Identity provider unreachable", body = ErrorResponse)
    )
)]
pub async fn sign_in_handler(
    Extension(workspace): Extension<Arc<Workspace>>,
    payload: Result<Json<SignInRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let req = json_body(payload)?;
    workspace
        .session
        .sign_in(&req.email, &req.password)
        .await
        .map_err(|e| auth_failure(&e))?;
    Ok(Json(SessionResponse::from(&workspace.session.snapshot())))
}

/// POST /api/auth/sign-up - Create an account
#[utoipa::path(
    post,
    path = "/api/auth/sign-up",
    request_body = SignUpRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = SignUpResponse),
        (status = 200, description = "Account created; e-mail confirmation required", body = SignUpResponse),
        (status = 400, description = "Form validation failed", body = ErrorResponse),
        (status = 422, description = "Rejected by the identity provider", body = ErrorResponse)
    )
)]
pub async fn sign_up_handler(
    Extension(workspace): Extension<Arc<Workspace>>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let req = json_body(payload)?;
    let form = SignUpForm {
        display_name: req.display_name,
        email: req.email,
        password: req.password,
        confirm_password: req.confirm_password,
    };
    form.validate().map_err(|e| auth_failure(&e.into()))?;

    let result = workspace
        .session
        .sign_up(&form.email, &form.password, &form.display_name)
        .await
        .map_err(|e| auth_failure(&e))?;

    let response = match result {
        SignUpResult::SignedIn(user) => (
            StatusCode::CREATED,
            Json(SignUpResponse {
                status: "signed_in".to_string(),
                user: Some(UserResponse::from(&user)),
                message: None,
            }),
        ),
        SignUpResult::ConfirmationRequired { email } => {
            info!(email = %email, "Sign-up awaiting e-mail confirmation");
            (
                StatusCode::OK,
                Json(SignUpResponse {
                    status: "confirmation_required".to_string(),
                    user: None,
                    message: Some(CONFIRM_EMAIL_MESSAGE.to_string()),
                }),
            )
        }
    };
    Ok(response)
}

/// POST /api/auth/sign-out - Sign out (always succeeds locally)
#[utoipa::path(
    post,
    path = "/api/auth/sign-out",
    responses(
        (status = 200, description = "Signed out", body = SessionResponse)
    )
)]
pub async fn sign_out_handler(Extension(workspace): Extension<Arc<Workspace>>) -> impl IntoResponse {
    workspace.session.sign_out().await;
    Json(SessionResponse::from(&workspace.session.snapshot()))
}

//=========================================================================================
// Federated Sign-in (Browser Redirects)
//=========================================================================================

/// GET /auth/oauth - Send the browser to the federated provider.
pub async fn oauth_start_handler(
    State(state): State<Arc<AppState>>,
    Extension(workspace): Extension<Arc<Workspace>>,
) -> Redirect {
    let result = workspace
        .session
        .sign_in_federated(&state.config.oauth_provider, &state.config.oauth_callback_url())
        .await;
    match result {
        Ok(url) => Redirect::to(&url),
        Err(e) => {
            warn!(error = %e, "Could not start federated sign-in");
            landing_with_error(&state.config.site_url, &e.to_string())
        }
    }
}

#[derive(Deserialize, Debug, Default)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// GET /auth/callback - The provider sends the browser back here.
pub async fn oauth_callback_handler(
    State(state): State<Arc<AppState>>,
    Extension(workspace): Extension<Arc<Workspace>>,
    Query(query): Query<CallbackQuery>,
) -> Redirect {
    let site_url = &state.config.site_url;
    if let Some(error) = query.error_description.or(query.error) {
        warn!(error = %error, "Federated provider returned an error");
        return landing_with_error(site_url, &error);
    }
    let Some(code) = query.code else {
        return landing_with_error(site_url, "Sign-in was cancelled. Please try again.");
    };

    match workspace.session.complete_federated(&code).await {
        // The landing page shows the success state, then moves on to the dashboard.
        Ok(_) => Redirect::to("/"),
        Err(e) => landing_with_error(site_url, &e.to_string()),
    }
}

fn landing_with_error(site_url: &str, message: &str) -> Redirect {
    match Url::parse_with_params(&format!("{site_url}/"), &[("error", message)]) {
        Ok(url) => Redirect::to(&format!("/?{}", url.query().unwrap_or_default())),
        Err(_) => Redirect::to("/"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[test]
    fn error_redirect_is_url_encoded() {
        let response = landing_with_error("http://localhost:3000", "Invalid email or password").into_response();
        let location = response.headers()["location"].to_str().unwrap();
        assert_eq!(location, "/?error=Invalid+email+or+password");
    }
}
