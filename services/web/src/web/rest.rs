//! services/web/src/web/rest.rs
//!
//! Contains the Axum handlers for the JSON API and the master definition for
//! the OpenAPI specification.

use crate::web::protocol::{
    collection_failure, json_body, path_id, unknown_variant, AnalyticsResponse,
    CollectionRequest, CollectionResponse, DashboardViewRequest, DashboardViewResponse,
    ErrorResponse, HandlerError, ListQuery, SessionResponse, ShareLinkResponse, SignInRequest,
    SignUpRequest, SignUpResponse, TopCollectionResponse, SaleResponse, MonthlyEarningsResponse,
    UserResponse,
};
use crate::web::state::{AppState, Workspace};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use paypeek_core::analytics::{monthly_earnings, recent_sales, AnalyticsSummary};
use paypeek_core::collections::share_link;
use paypeek_core::{compose, CollectionError};
use std::sync::Arc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        session_handler,
        crate::web::auth::sign_in_handler,
        crate::web::auth::sign_up_handler,
        crate::web::auth::sign_out_handler,
        list_collections_handler,
        create_collection_handler,
        get_collection_handler,
        update_collection_handler,
        delete_collection_handler,
        share_link_handler,
        analytics_handler,
        get_view_handler,
        update_view_handler,
    ),
    components(
        schemas(
            ErrorResponse, SessionResponse, UserResponse, SignInRequest, SignUpRequest,
            SignUpResponse, CollectionRequest, CollectionResponse, ShareLinkResponse,
            AnalyticsResponse, TopCollectionResponse, SaleResponse, MonthlyEarningsResponse,
            DashboardViewRequest, DashboardViewResponse
        )
    ),
    tags(
        (name = "PayPeek API", description = "Session, collection and dashboard endpoints for content creators.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Session
//=========================================================================================

/// Current session state of this browser. Waits for the session restore.
#[utoipa::path(
    get,
    path = "/api/session",
    responses(
        (status = 200, description = "Session state", body = SessionResponse)
    )
)]
pub async fn session_handler(Extension(workspace): Extension<Arc<Workspace>>) -> Json<SessionResponse> {
    let snapshot = workspace.session.resolved().await;
    Json(SessionResponse::from(&snapshot))
}

//=========================================================================================
// Collections
//=========================================================================================

/// List collections, filtered and sorted. Absent parameters fall back to the dashboard view.
#[utoipa::path(
    get,
    path = "/api/collections",
    params(ListQuery),
    responses(
        (status = 200, description = "Matching collections", body = [CollectionResponse]),
        (status = 400, description = "Unknown sort option or direction", body = ErrorResponse),
        (status = 401, description = "Not signed in", body = ErrorResponse)
    )
)]
pub async fn list_collections_handler(
    State(state): State<Arc<AppState>>,
    Extension(workspace): Extension<Arc<Workspace>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, HandlerError> {
    let view = workspace.view.lock().await.clone();
    let sort_option = match query.sort.as_deref() {
        Some(raw) => raw.parse().map_err(unknown_variant)?,
        None => view.sort_option,
    };
    let sort_direction = match query.dir.as_deref() {
        Some(raw) => raw.parse().map_err(unknown_variant)?,
        None => view.sort_direction,
    };
    let search = query.q.unwrap_or(view.search_query);

    let collections = workspace.collections.lock().await;
    let body: Vec<CollectionResponse> = compose(collections.list(), &search, sort_option, sort_direction)
        .into_iter()
        .map(|c| CollectionResponse::new(c, &state.config.share_base_url))
        .collect();
    Ok(Json(body))
}

/// Create a collection.
#[utoipa::path(
    post,
    path = "/api/collections",
    request_body = CollectionRequest,
    responses(
        (status = 201, description = "Collection created", body = CollectionResponse),
        (status = 400, description = "Malformed request", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
pub async fn create_collection_handler(
    State(state): State<Arc<AppState>>,
    Extension(workspace): Extension<Arc<Workspace>>,
    payload: Result<Json<CollectionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let draft = json_body(payload)?.into_draft().map_err(unknown_variant)?;
    let created = workspace
        .collections
        .lock()
        .await
        .create(draft)
        .map_err(collection_failure)?;
    info!(workspace = %workspace.id, collection = %created.id, "Collection created");
    Ok((
        StatusCode::CREATED,
        Json(CollectionResponse::new(&created, &state.config.share_base_url)),
    ))
}

/// Fetch one collection.
#[utoipa::path(
    get,
    path = "/api/collections/{id}",
    params(("id" = Uuid, Path, description = "Collection id")),
    responses(
        (status = 200, description = "The collection", body = CollectionResponse),
        (status = 404, description = "No such collection", body = ErrorResponse)
    )
)]
pub async fn get_collection_handler(
    State(state): State<Arc<AppState>>,
    Extension(workspace): Extension<Arc<Workspace>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = path_id(id)?;
    let collections = workspace.collections.lock().await;
    let collection = collections
        .get(id)
        .ok_or_else(|| collection_failure(CollectionError::NotFound(id)))?;
    Ok(Json(CollectionResponse::new(collection, &state.config.share_base_url)))
}

/// Replace the editable fields of a collection. Views and earnings are kept.
#[utoipa::path(
    put,
    path = "/api/collections/{id}",
    params(("id" = Uuid, Path, description = "Collection id")),
    request_body = CollectionRequest,
    responses(
        (status = 200, description = "Collection updated", body = CollectionResponse),
        (status = 404, description = "No such collection", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse)
    )
)]
pub async fn update_collection_handler(
    State(state): State<Arc<AppState>>,
    Extension(workspace): Extension<Arc<Workspace>>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<CollectionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = path_id(id)?;
    let draft = json_body(payload)?.into_draft().map_err(unknown_variant)?;
    let updated = workspace
        .collections
        .lock()
        .await
        .update(id, draft)
        .map_err(collection_failure)?;
    Ok(Json(CollectionResponse::new(&updated, &state.config.share_base_url)))
}

/// Delete a collection.
#[utoipa::path(
    delete,
    path = "/api/collections/{id}",
    params(("id" = Uuid, Path, description = "Collection id")),
    responses(
        (status = 204, description = "Collection deleted"),
        (status = 404, description = "No such collection; nothing changed", body = ErrorResponse)
    )
)]
pub async fn delete_collection_handler(
    Extension(workspace): Extension<Arc<Workspace>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, HandlerError> {
    let id = path_id(id)?;
    if workspace.collections.lock().await.delete(id) {
        info!(workspace = %workspace.id, collection = %id, "Collection deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(collection_failure(CollectionError::NotFound(id)))
    }
}

/// The public link to share a collection with buyers.
#[utoipa::path(
    get,
    path = "/api/collections/{id}/link",
    params(("id" = Uuid, Path, description = "Collection id")),
    responses(
        (status = 200, description = "Share link", body = ShareLinkResponse),
        (status = 404, description = "No such collection", body = ErrorResponse)
    )
)]
pub async fn share_link_handler(
    State(state): State<Arc<AppState>>,
    Extension(workspace): Extension<Arc<Workspace>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let id = path_id(id)?;
    if workspace.collections.lock().await.get(id).is_none() {
        return Err(collection_failure(CollectionError::NotFound(id)));
    }
    Ok(Json(ShareLinkResponse {
        id,
        url: share_link(&state.config.share_base_url, id),
    }))
}

//=========================================================================================
// Analytics and Dashboard View
//=========================================================================================

/// Totals, top collections and the sales and earnings series.
#[utoipa::path(
    get,
    path = "/api/analytics",
    responses(
        (status = 200, description = "Analytics summary", body = AnalyticsResponse)
    )
)]
pub async fn analytics_handler(Extension(workspace): Extension<Arc<Workspace>>) -> Json<AnalyticsResponse> {
    let summary = AnalyticsSummary::from_collections(workspace.collections.lock().await.list());
    Json(AnalyticsResponse::new(&summary, &recent_sales(), &monthly_earnings()))
}

#[utoipa::path(
    get,
    path = "/api/dashboard/view",
    responses(
        (status = 200, description = "Current dashboard view", body = DashboardViewResponse)
    )
)]
pub async fn get_view_handler(Extension(workspace): Extension<Arc<Workspace>>) -> Json<DashboardViewResponse> {
    Json(DashboardViewResponse::from(&*workspace.view.lock().await))
}

/// Update the dashboard view. Absent fields keep their value; an unknown name changes nothing.
#[utoipa::path(
    put,
    path = "/api/dashboard/view",
    request_body = DashboardViewRequest,
    responses(
        (status = 200, description = "Updated dashboard view", body = DashboardViewResponse),
        (status = 400, description = "Unknown option name", body = ErrorResponse)
    )
)]
pub async fn update_view_handler(
    Extension(workspace): Extension<Arc<Workspace>>,
    payload: Result<Json<DashboardViewRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HandlerError> {
    let update = json_body(payload)?;
    let mut view = workspace.view.lock().await;
    update.apply_to(&mut view).map_err(unknown_variant)?;
    Ok(Json(DashboardViewResponse::from(&*view)))
}
