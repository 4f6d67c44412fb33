pub mod auth;
pub mod content;
pub mod middleware;
pub mod pages;
pub mod protocol;
pub mod rest;
pub mod state;

use crate::error::ApiError;
use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use self::state::AppState;

/// Builds the full application: pages, the JSON API and the Swagger UI.
pub fn router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = HeaderValue::from_str(&state.config.site_url)
        .map_err(|e| ApiError::Internal(format!("SITE_URL is not a valid origin: {e}")))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT]);

    // Public routes (no session required)
    let public_api = Router::new()
        .route("/api/session", get(rest::session_handler))
        .route("/api/auth/sign-in", post(auth::sign_in_handler))
        .route("/api/auth/sign-up", post(auth::sign_up_handler))
        .route("/api/auth/sign-out", post(auth::sign_out_handler));

    // Protected routes (signed-in workspace required)
    let protected_api = Router::new()
        .route(
            "/api/collections",
            get(rest::list_collections_handler).post(rest::create_collection_handler),
        )
        .route(
            "/api/collections/{id}",
            get(rest::get_collection_handler)
                .put(rest::update_collection_handler)
                .delete(rest::delete_collection_handler),
        )
        .route("/api/collections/{id}/link", get(rest::share_link_handler))
        .route("/api/analytics", get(rest::analytics_handler))
        .route(
            "/api/dashboard/view",
            get(rest::get_view_handler).put(rest::update_view_handler),
        )
        .route_layer(axum_middleware::from_fn(middleware::require_session));

    let pages = Router::new()
        .route("/", get(pages::landing_page))
        .route("/dashboard", get(pages::dashboard_page))
        .route("/auth/oauth", get(auth::oauth_start_handler))
        .route("/auth/callback", get(auth::oauth_callback_handler))
        .fallback(pages::fallback_page);

    let app = Router::new()
        .merge(public_api)
        .merge(protected_api)
        .merge(pages)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::attach_workspace,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()));

    Ok(app)
}
