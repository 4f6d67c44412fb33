//! services/web/src/web/pages.rs
//!
//! Server-rendered pages. Every page asks the route guard first and only
//! renders when the guard allows it.

use crate::web::content::{Faq, Item, Testimonial, FAQS, FEATURES, STEPS, TESTIMONIALS};
use crate::web::protocol::{DashboardViewRequest, DashboardViewResponse, UserResponse};
use crate::web::state::{AppState, Workspace};
use axum::{
    extract::{Query, Request, State},
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
    Extension,
};
use chrono::{Datelike, Utc};
use minijinja::{Environment, UndefinedBehavior};
use paypeek_core::analytics::{monthly_earnings, recent_sales, AnalyticsSummary};
use paypeek_core::collections::share_link;
use paypeek_core::domain::{Collection, DashboardTab, SortOption, User};
use paypeek_core::{decide, GuardDecision, Route, SessionSnapshot};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

//=========================================================================================
// Template Environment
//=========================================================================================

const TEMPLATES: [(&str, &str); 6] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("landing.html", include_str!("../../templates/landing.html")),
    ("auth_success.html", include_str!("../../templates/auth_success.html")),
    ("dashboard.html", include_str!("../../templates/dashboard.html")),
    ("placeholder.html", include_str!("../../templates/placeholder.html")),
    ("not_found.html", include_str!("../../templates/not_found.html")),
];

/// Builds the template environment with every page template loaded.
pub fn templates() -> Result<Environment<'static>, minijinja::Error> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    for (name, source) in TEMPLATES {
        env.add_template(name, source)?;
    }
    Ok(env)
}

fn render<S: Serialize>(env: &Environment<'static>, status: StatusCode, name: &str, context: S) -> Response {
    let rendered = env
        .get_template(name)
        .and_then(|template| template.render(context));
    match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(template = name, "Failed to render page: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page").into_response()
        }
    }
}

//=========================================================================================
// Page Contexts
//=========================================================================================

#[derive(Serialize)]
struct LandingPage {
    title: &'static str,
    year: i32,
    flash: Option<String>,
    features: &'static [Item],
    steps: &'static [Item],
    testimonials: &'static [Testimonial],
    faqs: &'static [Faq],
}

#[derive(Serialize)]
struct AuthSuccessPage {
    title: &'static str,
    year: i32,
    user: UserResponse,
    redirect_to: String,
    delay_ms: u64,
    delay_secs: u64,
}

#[derive(Serialize)]
struct PlaceholderPage {
    title: &'static str,
    year: i32,
    retry_to: String,
}

#[derive(Serialize)]
struct NotFoundPage {
    title: &'static str,
    year: i32,
    path: String,
}

#[derive(Serialize)]
struct CollectionCard {
    id: String,
    title: String,
    description: Option<String>,
    thumbnail_url: Option<String>,
    price: String,
    expiry: String,
    /// Raw values that prefill the edit form.
    price_value: f64,
    expiry_value: String,
    status: &'static str,
    item_count: Option<u32>,
    views: u64,
    earnings: String,
    share_link: String,
}

impl CollectionCard {
    fn new(collection: &Collection, share_base: &str) -> Self {
        Self {
            id: collection.id.to_string(),
            title: collection.title.clone(),
            description: collection.description.clone(),
            thumbnail_url: collection.thumbnail_url.clone(),
            price: money(collection.price),
            expiry: collection.expiry_date.format("%b %-d, %Y").to_string(),
            price_value: collection.price,
            expiry_value: collection.expiry_date.format("%Y-%m-%d").to_string(),
            status: collection.status.as_str(),
            item_count: collection.item_count,
            views: collection.views.unwrap_or(0),
            earnings: money(collection.earnings.unwrap_or(0.0)),
            share_link: share_link(share_base, collection.id),
        }
    }
}

#[derive(Serialize)]
struct ChartBar {
    month: &'static str,
    earnings: String,
    height: f64,
}

#[derive(Serialize)]
struct TopRow {
    title: String,
    views: u64,
    earnings: String,
}

#[derive(Serialize)]
struct SaleRow {
    collection: String,
    buyer: String,
    amount: String,
    date: String,
}

#[derive(Serialize)]
struct Choice {
    value: &'static str,
    selected: bool,
}

#[derive(Serialize)]
struct DashboardPage {
    title: &'static str,
    year: i32,
    user: UserResponse,
    view: DashboardViewResponse,
    tabs: Vec<Choice>,
    sort_options: Vec<Choice>,
    flipped_direction: &'static str,
    collections: Vec<CollectionCard>,
    total_collections: usize,
    total_earnings: String,
    total_views: u64,
    active_collections: usize,
    expired_collections: usize,
    top_collections: Vec<TopRow>,
    sales: Vec<SaleRow>,
    chart: Vec<ChartBar>,
}

fn money(amount: f64) -> String {
    format!("${:.2}", amount)
}

fn year() -> i32 {
    Utc::now().year()
}

//=========================================================================================
// Handlers
//=========================================================================================

#[derive(Deserialize, Debug, Default)]
pub struct LandingQuery {
    /// A message to show above the sign-in form, e.g. after a failed federated sign-in.
    pub error: Option<String>,
}

/// GET / - The landing page.
pub async fn landing_page(
    State(state): State<Arc<AppState>>,
    Extension(workspace): Extension<Arc<Workspace>>,
    Query(query): Query<LandingQuery>,
) -> Response {
    let snapshot = workspace.session.snapshot();
    match decide(&snapshot, &Route::Landing) {
        GuardDecision::Render => render(
            &state.templates,
            StatusCode::OK,
            "landing.html",
            LandingPage {
                title: "PayPeek - Share and monetize your digital content",
                year: year(),
                flash: query.error,
                features: &FEATURES,
                steps: &STEPS,
                testimonials: &TESTIMONIALS,
                faqs: &FAQS,
            },
        ),
        other => guarded(&state, &snapshot, other, &Route::Landing),
    }
}

/// GET /dashboard - The creator dashboard. Query parameters update the view state.
pub async fn dashboard_page(
    State(state): State<Arc<AppState>>,
    Extension(workspace): Extension<Arc<Workspace>>,
    Query(update): Query<DashboardViewRequest>,
) -> Response {
    let snapshot = workspace.session.snapshot();
    let user = match (decide(&snapshot, &Route::Dashboard), snapshot.user.as_ref()) {
        (GuardDecision::Render, Some(user)) => user,
        (decision, _) => return guarded(&state, &snapshot, decision, &Route::Dashboard),
    };

    let view = {
        let mut view = workspace.view.lock().await;
        if let Err(e) = update.apply_to(&mut view) {
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
        view.clone()
    };

    let collections = workspace.collections.lock().await;
    let summary = AnalyticsSummary::from_collections(collections.list());
    let months = monthly_earnings();
    let best = months.iter().map(|m| m.earnings).fold(0.0, f64::max);

    let page = DashboardPage {
        title: "Dashboard - PayPeek",
        year: year(),
        user: UserResponse::from(user),
        view: DashboardViewResponse::from(&view),
        tabs: DashboardTab::ALL
            .iter()
            .map(|tab| Choice {
                value: tab.as_str(),
                selected: *tab == view.active_tab,
            })
            .collect(),
        sort_options: SortOption::ALL
            .iter()
            .map(|option| Choice {
                value: option.as_str(),
                selected: *option == view.sort_option,
            })
            .collect(),
        flipped_direction: view.sort_direction.reversed().as_str(),
        collections: view
            .visible(collections.list())
            .into_iter()
            .map(|c| CollectionCard::new(c, &state.config.share_base_url))
            .collect(),
        total_collections: collections.len(),
        total_earnings: money(summary.total_earnings),
        total_views: summary.total_views,
        active_collections: summary.active_collections,
        expired_collections: summary.expired_collections,
        top_collections: summary
            .top_collections
            .iter()
            .map(|top| TopRow {
                title: top.title.clone(),
                views: top.views,
                earnings: money(top.earnings),
            })
            .collect(),
        sales: recent_sales()
            .into_iter()
            .map(|sale| SaleRow {
                collection: sale.collection,
                buyer: sale.buyer,
                amount: money(sale.amount),
                date: sale.date.format("%b %-d, %Y %H:%M").to_string(),
            })
            .collect(),
        chart: months
            .iter()
            .map(|m| ChartBar {
                month: m.month,
                earnings: money(m.earnings),
                height: m.share_of(best),
            })
            .collect(),
    };
    drop(collections);

    debug!(workspace = %workspace.id, tab = %view.active_tab, "Rendering dashboard");
    render(&state.templates, StatusCode::OK, "dashboard.html", page)
}

/// Any other address. A browser without a workspace is treated as signed out.
pub async fn fallback_page(State(state): State<Arc<AppState>>, uri: Uri, req: Request) -> Response {
    let snapshot = match req.extensions().get::<Arc<Workspace>>() {
        Some(workspace) => workspace.session.snapshot(),
        None => SessionSnapshot {
            user: None,
            loading: false,
            just_authenticated: false,
        },
    };
    let route = Route::from_path(uri.path());
    let decision = decide(&snapshot, &route);
    guarded(&state, &snapshot, decision, &route)
}

/// Responds to every guard decision other than a plain render of a known page.
fn guarded(state: &AppState, snapshot: &SessionSnapshot, decision: GuardDecision, route: &Route) -> Response {
    match decision {
        GuardDecision::Redirect(target) => Redirect::to(target.path()).into_response(),
        GuardDecision::RedirectAfterSuccess(target) => match snapshot.user.as_ref() {
            Some(user) => success_page(state, user, &target),
            None => Redirect::to(target.path()).into_response(),
        },
        GuardDecision::Placeholder => render(
            &state.templates,
            StatusCode::OK,
            "placeholder.html",
            PlaceholderPage {
                title: "Loading - PayPeek",
                year: year(),
                retry_to: route.path().to_string(),
            },
        ),
        GuardDecision::NotFound | GuardDecision::Render => render(
            &state.templates,
            StatusCode::NOT_FOUND,
            "not_found.html",
            NotFoundPage {
                title: "Page not found - PayPeek",
                year: year(),
                path: route.path().to_string(),
            },
        ),
    }
}

/// The sign-in success state, which navigates on after the success delay.
fn success_page(state: &AppState, user: &User, target: &Route) -> Response {
    let delay_ms = u64::try_from(state.config.success_delay.as_millis()).unwrap_or(u64::MAX);
    render(
        &state.templates,
        StatusCode::OK,
        "auth_success.html",
        AuthSuccessPage {
            title: "Welcome - PayPeek",
            year: year(),
            user: UserResponse::from(user),
            redirect_to: target.path().to_string(),
            delay_ms,
            delay_secs: delay_ms.div_ceil(1000),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_templates_compile() {
        let env = templates().unwrap();
        for (name, _) in TEMPLATES {
            assert!(env.get_template(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn not_found_page_renders() {
        let env = templates().unwrap();
        let response = render(
            &env,
            StatusCode::NOT_FOUND,
            "not_found.html",
            NotFoundPage {
                title: "Page not found - PayPeek",
                year: 2026,
                path: "/nowhere".into(),
            },
        );
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(money(19.99), "$19.99");
        assert_eq!(money(0.0), "$0.00");
    }
}
