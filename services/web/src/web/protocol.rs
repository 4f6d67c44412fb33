//! services/web/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser and the server, and
//! the mapping from domain errors to HTTP error responses.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use paypeek_core::analytics::{AnalyticsSummary, MonthlyEarnings, Sale, TopCollection};
use paypeek_core::collections::share_link;
use paypeek_core::domain::{
    Collection, CollectionDraft, CollectionStatus, DashboardTab, SortDirection, SortOption,
    UnknownVariant, User, ViewMode,
};
use paypeek_core::{AuthError, CollectionError, DashboardView, GuardState, SessionSnapshot};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

//=========================================================================================
// Errors
//=========================================================================================

/// The body of every error response.
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// What a failing handler returns.
pub type HandlerError = (StatusCode, Json<ErrorResponse>);

pub fn failure(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Maps an authentication failure to its status code; the body carries the user-facing message.
pub fn auth_failure(err: &AuthError) -> HandlerError {
    let status = match err {
        AuthError::ValidationFailure(_) => StatusCode::BAD_REQUEST,
        AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::Provider(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AuthError::NetworkFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
        AuthError::Unexpected(detail) => {
            error!(detail = %detail, "Authentication failed unexpectedly");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    failure(status, err.to_string())
}

pub fn collection_failure(err: CollectionError) -> HandlerError {
    let status = match err {
        CollectionError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    failure(status, err.to_string())
}

pub fn unknown_variant(err: UnknownVariant) -> HandlerError {
    failure(StatusCode::BAD_REQUEST, err.to_string())
}

/// Unwraps a JSON body, answering malformed ones with the usual error body.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, HandlerError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| failure(rejection.status(), rejection.body_text()))
}

/// Unwraps a path id, answering malformed ones with the usual error body.
pub fn path_id(id: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, HandlerError> {
    id.map(|Path(id)| id)
        .map_err(|_| failure(StatusCode::BAD_REQUEST, "Invalid collection id"))
}

//=========================================================================================
// Session and Authentication
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    /// The name shown in the dashboard header.
    pub label: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url.clone(),
            label: user.label().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct SessionResponse {
    /// One of `resolving`, `locked`, `unlocked`.
    pub state: String,
    pub user: Option<UserResponse>,
    pub just_authenticated: bool,
}

impl From<&SessionSnapshot> for SessionResponse {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            state: GuardState::from(snapshot).as_str().to_string(),
            user: snapshot.user.as_ref().map(UserResponse::from),
            just_authenticated: snapshot.just_authenticated,
        }
    }
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct SignInRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct SignUpRequest {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct SignUpResponse {
    /// `signed_in` or `confirmation_required`.
    pub status: String,
    pub user: Option<UserResponse>,
    pub message: Option<String>,
}

//=========================================================================================
// Collections
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct CollectionResponse {
    pub id: Uuid,
    pub title: String,
    pub price: f64,
    pub expiry_date: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub item_count: Option<u32>,
    /// `active` or `expired`.
    pub status: String,
    pub views: Option<u64>,
    pub earnings: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub share_link: String,
}

impl CollectionResponse {
    pub fn new(collection: &Collection, share_base: &str) -> Self {
        Self {
            id: collection.id,
            title: collection.title.clone(),
            price: collection.price,
            expiry_date: collection.expiry_date,
            thumbnail_url: collection.thumbnail_url.clone(),
            description: collection.description.clone(),
            item_count: collection.item_count,
            status: collection.status.as_str().to_string(),
            views: collection.views,
            earnings: collection.earnings,
            created_at: collection.created_at,
            updated_at: collection.updated_at,
            share_link: share_link(share_base, collection.id),
        }
    }
}

/// The create/edit form. `views` and `earnings` are only honoured on create.
#[derive(Deserialize, Debug, ToSchema)]
pub struct CollectionRequest {
    pub title: String,
    pub price: f64,
    pub expiry_date: DateTime<Utc>,
    pub thumbnail_url: Option<String>,
    pub description: Option<String>,
    pub item_count: Option<u32>,
    /// Defaults to `active`.
    pub status: Option<String>,
    pub views: Option<u64>,
    pub earnings: Option<f64>,
}

impl CollectionRequest {
    pub fn into_draft(self) -> Result<CollectionDraft, UnknownVariant> {
        let status = match self.status.as_deref() {
            Some(raw) => raw.parse::<CollectionStatus>()?,
            None => CollectionStatus::Active,
        };
        Ok(CollectionDraft {
            title: self.title,
            price: self.price,
            expiry_date: self.expiry_date,
            thumbnail_url: self.thumbnail_url,
            description: self.description,
            item_count: self.item_count,
            status,
            views: self.views,
            earnings: self.earnings,
        })
    }
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Case-insensitive search over title and description.
    pub q: Option<String>,
    /// `name`, `date` or `price`.
    pub sort: Option<String>,
    /// `asc` or `desc`.
    pub dir: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ShareLinkResponse {
    pub id: Uuid,
    pub url: String,
}

//=========================================================================================
// Analytics
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct TopCollectionResponse {
    pub id: Uuid,
    pub title: String,
    pub earnings: f64,
    pub views: u64,
}

impl From<&TopCollection> for TopCollectionResponse {
    fn from(top: &TopCollection) -> Self {
        Self {
            id: top.id,
            title: top.title.clone(),
            earnings: top.earnings,
            views: top.views,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct SaleResponse {
    pub id: String,
    pub collection: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub buyer: String,
}

impl From<&Sale> for SaleResponse {
    fn from(sale: &Sale) -> Self {
        Self {
            id: sale.id.clone(),
            collection: sale.collection.clone(),
            amount: sale.amount,
            date: sale.date,
            buyer: sale.buyer.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct MonthlyEarningsResponse {
    pub month: String,
    pub earnings: f64,
}

impl From<&MonthlyEarnings> for MonthlyEarningsResponse {
    fn from(month: &MonthlyEarnings) -> Self {
        Self {
            month: month.month.to_string(),
            earnings: month.earnings,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct AnalyticsResponse {
    pub total_earnings: f64,
    pub total_views: u64,
    pub active_collections: usize,
    pub expired_collections: usize,
    pub top_collections: Vec<TopCollectionResponse>,
    pub recent_sales: Vec<SaleResponse>,
    pub monthly_earnings: Vec<MonthlyEarningsResponse>,
}

impl AnalyticsResponse {
    pub fn new(summary: &AnalyticsSummary, sales: &[Sale], months: &[MonthlyEarnings]) -> Self {
        Self {
            total_earnings: summary.total_earnings,
            total_views: summary.total_views,
            active_collections: summary.active_collections,
            expired_collections: summary.expired_collections,
            top_collections: summary.top_collections.iter().map(Into::into).collect(),
            recent_sales: sales.iter().map(Into::into).collect(),
            monthly_earnings: months.iter().map(Into::into).collect(),
        }
    }
}

//=========================================================================================
// Dashboard View
//=========================================================================================

/// A partial update; absent fields keep their current value.
#[derive(Deserialize, Debug, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DashboardViewRequest {
    #[serde(alias = "q")]
    pub search_query: Option<String>,
    #[serde(alias = "sort")]
    pub sort_option: Option<String>,
    #[serde(alias = "dir")]
    pub sort_direction: Option<String>,
    #[serde(alias = "view")]
    pub view_mode: Option<String>,
    #[serde(alias = "tab")]
    pub active_tab: Option<String>,
}

impl DashboardViewRequest {
    /// Validates every field before touching `view`, so a bad value changes nothing.
    pub fn apply_to(&self, view: &mut DashboardView) -> Result<(), UnknownVariant> {
        let sort_option = parse_opt::<SortOption>(&self.sort_option)?;
        let sort_direction = parse_opt::<SortDirection>(&self.sort_direction)?;
        let view_mode = parse_opt::<ViewMode>(&self.view_mode)?;
        let active_tab = parse_opt::<DashboardTab>(&self.active_tab)?;

        if let Some(query) = &self.search_query {
            view.search_query = query.clone();
        }
        if let Some(option) = sort_option {
            view.sort_option = option;
        }
        if let Some(direction) = sort_direction {
            view.sort_direction = direction;
        }
        if let Some(mode) = view_mode {
            view.view_mode = mode;
        }
        if let Some(tab) = active_tab {
            view.active_tab = tab;
        }
        Ok(())
    }
}

fn parse_opt<T>(raw: &Option<String>) -> Result<Option<T>, UnknownVariant>
where
    T: std::str::FromStr<Err = UnknownVariant>,
{
    raw.as_deref().map(str::parse).transpose()
}

#[derive(Serialize, Deserialize, Debug, PartialEq, ToSchema)]
pub struct DashboardViewResponse {
    pub search_query: String,
    pub sort_option: String,
    pub sort_direction: String,
    pub view_mode: String,
    pub active_tab: String,
}

impl From<&DashboardView> for DashboardViewResponse {
    fn from(view: &DashboardView) -> Self {
        Self {
            search_query: view.search_query.clone(),
            sort_option: view.sort_option.as_str().to_string(),
            sort_direction: view.sort_direction.as_str().to_string(),
            view_mode: view.view_mode.as_str().to_string(),
            active_tab: view.active_tab.as_str().to_string(),
        }
    }
}
