use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use web_lib::{
    adapters::{
        memory::{DEMO_EMAIL, DEMO_PASSWORD},
        MemoryIdentityProvider,
    },
    config::Config,
    web::{router, state::AppState},
};

fn app() -> Router {
    let config = Arc::new(Config::from_lookup(|_| None).unwrap());
    let identity = Arc::new(MemoryIdentityProvider::new().with_demo_account().unwrap());
    let state = Arc::new(AppState::new(config, identity).unwrap());
    router(state).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str, cookie: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

fn with_json(method: &str, uri: &str, cookie: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn json_body(response: Response) -> Value {
    serde_json::from_str(&text(response).await).unwrap()
}

fn location(response: &Response) -> &str {
    response.headers()[header::LOCATION].to_str().unwrap()
}

/// Opens a workspace and returns its `pp_client=<id>` cookie pair.
async fn client_cookie(app: &Router) -> String {
    let response = send(app, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

async fn signed_in(app: &Router) -> String {
    let cookie = client_cookie(app).await;
    let response = send(
        app,
        with_json(
            "POST",
            "/api/auth/sign-in",
            &cookie,
            json!({ "email": DEMO_EMAIL, "password": DEMO_PASSWORD }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    cookie
}

#[tokio::test]
async fn landing_page_renders_for_new_browsers() {
    let app = app();
    let response = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::SET_COOKIE));
    let html = text(response).await;
    assert!(html.contains("Share and monetize"));
    assert!(html.contains("Frequently asked questions"));
}

#[tokio::test]
async fn known_cookie_is_not_reissued() {
    let app = app();
    let cookie = client_cookie(&app).await;
    let response = send(&app, get("/", &cookie)).await;
    assert!(!response.headers().contains_key(header::SET_COOKIE));
}

#[tokio::test]
async fn dashboard_redirects_signed_out_browsers_to_landing() {
    let app = app();
    let cookie = client_cookie(&app).await;
    let response = send(&app, get("/dashboard", &cookie)).await;

    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn unknown_paths_are_not_found_when_signed_out() {
    let app = app();
    let cookie = client_cookie(&app).await;
    let response = send(&app, get("/pricing", &cookie)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(text(response).await.contains("Page not found"));
}

#[tokio::test]
async fn sign_in_shows_success_then_dashboard() {
    let app = app();
    let cookie = signed_in(&app).await;

    let session = json_body(send(&app, get("/api/session", &cookie)).await).await;
    assert_eq!(session["state"], "unlocked");
    assert_eq!(session["user"]["email"], DEMO_EMAIL);
    assert_eq!(session["just_authenticated"], true);

    let landing = send(&app, get("/", &cookie)).await;
    assert_eq!(landing.status(), StatusCode::OK);
    assert!(text(landing).await.contains("Welcome, Demo Creator!"));

    let dashboard = send(&app, get("/dashboard", &cookie)).await;
    assert_eq!(dashboard.status(), StatusCode::OK);
    let html = text(dashboard).await;
    assert!(html.contains("Demo Creator"));
    assert!(html.contains("Top collections"));

    let other = send(&app, get("/pricing", &cookie)).await;
    assert_eq!(location(&other), "/dashboard");
}

#[tokio::test]
async fn bad_credentials_are_rejected() {
    let app = app();
    let cookie = client_cookie(&app).await;

    let wrong = send(
        &app,
        with_json(
            "POST",
            "/api/auth/sign-in",
            &cookie,
            json!({ "email": DEMO_EMAIL, "password": "nope12" }),
        ),
    )
    .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(wrong).await["error"], "Invalid email or password");

    let blank = send(
        &app,
        with_json("POST", "/api/auth/sign-in", &cookie, json!({ "email": "" })),
    )
    .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let session = json_body(send(&app, get("/api/session", &cookie)).await).await;
    assert_eq!(session["state"], "locked");
}

#[tokio::test]
async fn sign_up_signs_in_and_rejects_duplicates() {
    let app = app();
    let cookie = client_cookie(&app).await;
    let form = json!({
        "display_name": "Rae",
        "email": "rae@example.com",
        "password": "Secret123",
        "confirm_password": "Secret123"
    });

    let created = send(&app, with_json("POST", "/api/auth/sign-up", &cookie, form.clone())).await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = json_body(created).await;
    assert_eq!(body["status"], "signed_in");
    assert_eq!(body["user"]["label"], "Rae");

    let again = send(&app, with_json("POST", "/api/auth/sign-up", &cookie, form)).await;
    assert_eq!(again.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let mismatch = send(
        &app,
        with_json(
            "POST",
            "/api/auth/sign-up",
            &cookie,
            json!({
                "display_name": "Sam",
                "email": "sam@example.com",
                "password": "Secret123",
                "confirm_password": "Secret124"
            }),
        ),
    )
    .await;
    assert_eq!(mismatch.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_requires_a_session() {
    let app = app();
    let cookie = client_cookie(&app).await;
    let response = send(&app, get("/api/collections", &cookie)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn collections_can_be_listed_searched_and_sorted() {
    let app = app();
    let cookie = signed_in(&app).await;

    let all = json_body(send(&app, get("/api/collections", &cookie)).await).await;
    assert_eq!(all.as_array().unwrap().len(), 6);

    let found = json_body(send(&app, get("/api/collections?q=VIDEO&sort=name&dir=asc", &cookie)).await).await;
    let titles: Vec<&str> = found
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, ["Digital Art Masterclass", "Fitness Workout Videos"]);

    let bad = send(&app, get("/api/collections?sort=colour", &cookie)).await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn collection_lifecycle() {
    let app = app();
    let cookie = signed_in(&app).await;

    let created = send(
        &app,
        with_json(
            "POST",
            "/api/collections",
            &cookie,
            json!({ "title": "Travel Vlog", "price": 4.5, "expiry_date": "2030-01-01T00:00:00Z" }),
        ),
    )
    .await;
    assert_eq!(created.status(), StatusCode::CREATED);
    let created = json_body(created).await;
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["status"], "active");
    assert_eq!(created["share_link"], format!("https://paypeek.com/c/{id}"));

    let updated = send(
        &app,
        with_json(
            "PUT",
            &format!("/api/collections/{id}"),
            &cookie,
            json!({ "title": "Travel Vlog II", "price": 6.0, "expiry_date": "2030-01-01T00:00:00Z" }),
        ),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(json_body(updated).await["title"], "Travel Vlog II");

    let link = json_body(send(&app, get(&format!("/api/collections/{id}/link"), &cookie)).await).await;
    assert_eq!(link["url"], format!("https://paypeek.com/c/{id}"));

    let delete = |uri: String| {
        Request::delete(uri)
            .header(header::COOKIE, cookie.as_str())
            .body(Body::empty())
            .unwrap()
    };
    let removed = send(&app, delete(format!("/api/collections/{id}"))).await;
    assert_eq!(removed.status(), StatusCode::NO_CONTENT);
    let missing = send(&app, delete(format!("/api/collections/{id}"))).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let fetched = send(&app, get(&format!("/api/collections/{id}"), &cookie)).await;
    assert_eq!(fetched.status(), StatusCode::NOT_FOUND);

    let malformed = send(&app, get("/api/collections/not-a-uuid", &cookie)).await;
    assert_eq!(malformed.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_collections_are_rejected() {
    let app = app();
    let cookie = signed_in(&app).await;

    let blank = send(
        &app,
        with_json(
            "POST",
            "/api/collections",
            &cookie,
            json!({ "title": "  ", "price": 1.0, "expiry_date": "2030-01-01T00:00:00Z" }),
        ),
    )
    .await;
    assert_eq!(blank.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(blank).await["error"], "Title is required");

    let all = json_body(send(&app, get("/api/collections", &cookie)).await).await;
    assert_eq!(all.as_array().unwrap().len(), 6);
}

#[tokio::test]
async fn analytics_sum_the_seeded_collections() {
    let app = app();
    let cookie = signed_in(&app).await;

    let analytics = json_body(send(&app, get("/api/analytics", &cookie)).await).await;
    let total = analytics["total_earnings"].as_f64().unwrap();
    assert!((total - 8055.93).abs() < 1e-6);
    assert_eq!(analytics["top_collections"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn dashboard_view_updates_are_all_or_nothing() {
    let app = app();
    let cookie = signed_in(&app).await;

    let updated = send(
        &app,
        with_json(
            "PUT",
            "/api/dashboard/view",
            &cookie,
            json!({ "sort_option": "price", "view_mode": "list" }),
        ),
    )
    .await;
    assert_eq!(updated.status(), StatusCode::OK);

    let rejected = send(
        &app,
        with_json(
            "PUT",
            "/api/dashboard/view",
            &cookie,
            json!({ "sort_direction": "asc", "active_tab": "billing" }),
        ),
    )
    .await;
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    let view = json_body(send(&app, get("/api/dashboard/view", &cookie)).await).await;
    assert_eq!(view["sort_option"], "price");
    assert_eq!(view["view_mode"], "list");
    assert_eq!(view["sort_direction"], "desc");
    assert_eq!(view["active_tab"], "overview");

    let page = send(&app, get("/dashboard?tab=collections&q=photo", &cookie)).await;
    assert_eq!(page.status(), StatusCode::OK);
    let html = text(page).await;
    assert!(html.contains("Summer Photography Collection"));
    assert!(!html.contains("Cooking Recipes eBook"));
}

#[tokio::test]
async fn sign_out_locks_the_dashboard() {
    let app = app();
    let cookie = signed_in(&app).await;

    let response = send(
        &app,
        Request::post("/api/auth/sign-out")
            .header(header::COOKIE, cookie.as_str())
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["state"], "locked");

    let dashboard = send(&app, get("/dashboard", &cookie)).await;
    assert_eq!(location(&dashboard), "/");
}

#[tokio::test]
async fn federated_sign_in_round_trip() {
    let app = app();
    let cookie = client_cookie(&app).await;

    let start = send(&app, get("/auth/oauth", &cookie)).await;
    assert!(start.status().is_redirection());
    let provider_url = reqwest::Url::parse(location(&start)).unwrap();
    assert_eq!(provider_url.path(), "/auth/callback");
    let callback = format!("/auth/callback?{}", provider_url.query().unwrap());

    let back = send(&app, get(&callback, &cookie)).await;
    assert_eq!(location(&back), "/");

    let session = json_body(send(&app, get("/api/session", &cookie)).await).await;
    assert_eq!(session["user"]["email"], "demo+google@paypeek.com");

    // The verifier is single-use.
    let replay = send(&app, get(&callback, &cookie)).await;
    assert!(location(&replay).starts_with("/?error="));
}

#[tokio::test]
async fn provider_errors_return_to_landing() {
    let app = app();
    let cookie = client_cookie(&app).await;

    let response = send(&app, get("/auth/callback?error=access_denied", &cookie)).await;
    assert_eq!(location(&response), "/?error=access_denied");

    let landing = send(&app, get("/?error=access_denied", &cookie)).await;
    assert!(text(landing).await.contains("access_denied"));
}

#[tokio::test]
async fn collection_cards_offer_edit_copy_and_confirmed_delete() {
    let app = app();
    let cookie = signed_in(&app).await;

    let page = send(&app, get("/dashboard?tab=collections&q=cooking", &cookie)).await;
    assert_eq!(page.status(), StatusCode::OK);
    let html = text(page).await;

    let id = "00000000-0000-0000-0000-000000000004";
    assert!(html.contains(&format!("data-edit=\"{id}\"")));
    assert!(html.contains("value=\"2025-11-20\""));
    assert!(html.contains("value=\"112\""));
    assert!(html.contains("data-copy=\"https:"));
    assert!(html.contains("navigator.clipboard.writeText"));
    assert!(html.contains("window.confirm("));
    assert!(html.contains("name=\"status\""));
    assert!(html.contains("name=\"item_count\""));
}

#[tokio::test]
async fn stray_requests_do_not_open_workspaces() {
    let app = app();

    let unknown = send(&app, Request::get("/wp-login.php").body(Body::empty()).unwrap()).await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    assert!(!unknown.headers().contains_key(header::SET_COOKIE));
    assert!(text(unknown).await.contains("Page not found"));

    let api = send(&app, Request::get("/api/collections").body(Body::empty()).unwrap()).await;
    assert_eq!(api.status(), StatusCode::UNAUTHORIZED);
    assert!(!api.headers().contains_key(header::SET_COOKIE));

    let stale = send(&app, get("/pricing", &format!("pp_client={}", uuid::Uuid::new_v4()))).await;
    assert_eq!(stale.status(), StatusCode::NOT_FOUND);
    assert!(!stale.headers().contains_key(header::SET_COOKIE));
}
