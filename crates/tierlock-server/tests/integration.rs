#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;
use serde_json::Value;
use tower::ServiceExt;

use tierlock_core::config::AnonymousViewPolicy;
use tierlock_core::{AccessTier, Role, Tier};
use tierlock_server::auth::JwtManager;
use tierlock_server::intake::ModerationIntake;
use tierlock_server::ledger::EngagementLedger;
use tierlock_server::routes::{AppState, build_router};
use tierlock_server::storage::{Database, GameParams, LinkParams};

struct TestApp {
    router: axum::Router,
    jwt: Arc<JwtManager>,
    db: Database,
}

impl TestApp {
    fn token(&self, user_id: &str, role: Role) -> String {
        self.jwt.issue(user_id, role).unwrap().0
    }
}

fn link<'a>(id: &'a str, tier: Option<AccessTier>) -> LinkParams<'a> {
    LinkParams {
        id,
        game_id: "g1",
        position: 0,
        label: "Mirror",
        access_tier: tier,
        legacy_vip: false,
        target_url: Some("https://dl.example/direct"),
        member_url: None,
        plus_url: None,
        ultra_url: None,
    }
}

async fn app(policy: AnonymousViewPolicy) -> TestApp {
    let db = Database::open_in_memory().await.unwrap();

    db.create_game(&GameParams {
        id: "g1",
        title: "Hollow Pines",
        access_tier: Tier::Plus,
    })
    .await
    .unwrap();
    db.create_game(&GameParams {
        id: "g2",
        title: "Glass Harbor",
        access_tier: Tier::Ultra,
    })
    .await
    .unwrap();
    db.create_link(&link("free", Some(AccessTier::Free)))
        .await
        .unwrap();
    db.create_link(&LinkParams {
        position: 1,
        ..link("ultra", Some(AccessTier::Ultra))
    })
    .await
    .unwrap();
    db.create_link(&LinkParams {
        position: 2,
        target_url: None,
        member_url: Some("A"),
        ultra_url: Some("C"),
        ..link("diff", Some(AccessTier::Differentiated))
    })
    .await
    .unwrap();
    db.create_link(&LinkParams {
        position: 3,
        target_url: None,
        ..link("broken", Some(AccessTier::Differentiated))
    })
    .await
    .unwrap();

    let jwt = Arc::new(JwtManager::new(b"integration-secret", 3600));
    let timeout = Duration::from_secs(5);
    let state = AppState {
        jwt: Arc::clone(&jwt),
        ledger: EngagementLedger::new(db.clone(), timeout, policy),
        intake: ModerationIntake::new(db.clone(), timeout),
        db: db.clone(),
    };
    TestApp {
        router: build_router(state),
        jwt,
        db,
    }
}

async fn send_raw(
    app: &TestApp,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for &(name, value) in headers {
        builder = builder.header(name, value);
    }
    app.router
        .clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// Send a request to the app and return (status, JSON body).
async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let resp = send_raw(app, method, uri, headers).await;
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[tokio::test]
async fn health_ok() {
    let app = app(AnonymousViewPolicy::Reject).await;
    let (status, body) = send(&app, Method::GET, "/health", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn game_access_reports_upgrade_tier() {
    let app = app(AnonymousViewPolicy::Reject).await;

    let auth = bearer(&app.token("u1", Role::Member));
    let (status, body) = send(
        &app,
        Method::GET,
        "/games/g1/access",
        &[("authorization", &auth)],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);
    assert_eq!(body["reason"], "upgrade_required");
    assert_eq!(body["min_tier"], "plus");

    let auth = bearer(&app.token("u2", Role::Plus));
    let (_, body) = send(
        &app,
        Method::GET,
        "/games/g1/access",
        &[("authorization", &auth)],
    )
    .await;
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
async fn game_access_anonymous_not_authenticated() {
    let app = app(AnonymousViewPolicy::Reject).await;
    let (status, body) = send(&app, Method::GET, "/games/g1/access", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], false);
    assert_eq!(body["reason"], "not_authenticated");
}

#[tokio::test]
async fn invalid_token_is_401_not_anonymous() {
    let app = app(AnonymousViewPolicy::Reject).await;
    let (status, body) = send(
        &app,
        Method::GET,
        "/games/g1/access",
        &[("authorization", "Bearer garbage")],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "not_authenticated");
}

#[tokio::test]
async fn unknown_game_is_404() {
    let app = app(AnonymousViewPolicy::Reject).await;
    let (status, _) = send(&app, Method::GET, "/games/nope/access", &[]).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn links_listed_in_order_without_urls() {
    let app = app(AnonymousViewPolicy::Reject).await;
    let auth = bearer(&app.token("u1", Role::Plus));
    let (status, body) = send(
        &app,
        Method::GET,
        "/games/g1/links",
        &[("authorization", &auth)],
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let links = body.as_array().unwrap();
    let ids: Vec<_> = links.iter().map(|l| l["id"].as_str().unwrap()).collect();
    assert_eq!(ids, ["free", "ultra", "diff", "broken"]);
    assert_eq!(links[2]["access_tier"], "differentiated");
    assert!(links.iter().all(|l| l.get("url").is_none()));
}

#[tokio::test]
async fn link_listing_follows_game_tier() {
    let app = app(AnonymousViewPolicy::Reject).await;

    let member = bearer(&app.token("u1", Role::Member));
    let (status, body) = send(
        &app,
        Method::GET,
        "/games/g2/links",
        &[("authorization", &member)],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "upgrade_required");
    assert_eq!(body["min_tier"], "ultra");

    let (status, _) = send(&app, Method::GET, "/games/g1/links", &[]).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let support = bearer(&app.token("s1", Role::Support));
    let (status, body) = send(
        &app,
        Method::GET,
        "/games/g2/links",
        &[("authorization", &support)],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn resolve_counts_first_view_only() {
    let app = app(AnonymousViewPolicy::Reject).await;
    let auth = bearer(&app.token("u1", Role::Member));

    let (status, body) = send(
        &app,
        Method::POST,
        "/links/free/resolve",
        &[("authorization", &auth)],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["url"], "https://dl.example/direct");
    assert_eq!(body["is_new_view"], true);
    assert_eq!(body["total_views"], 1);

    let (_, body) = send(
        &app,
        Method::POST,
        "/links/free/resolve",
        &[("authorization", &auth)],
    )
    .await;
    assert_eq!(body["is_new_view"], false);
    assert_eq!(body["total_views"], 1);
}

#[tokio::test]
async fn resolve_denied_shows_upgrade_prompt() {
    let app = app(AnonymousViewPolicy::Reject).await;
    let auth = bearer(&app.token("u1", Role::Plus));

    let (status, body) = send(
        &app,
        Method::POST,
        "/links/ultra/resolve",
        &[("authorization", &auth)],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "upgrade_required");
    assert_eq!(body["min_tier"], "ultra");

    // A denied resolve must not count a view.
    let admin = bearer(&app.token("staff", Role::Admin));
    let (_, body) = send(
        &app,
        Method::POST,
        "/links/ultra/resolve",
        &[("authorization", &admin)],
    )
    .await;
    assert_eq!(body["total_views"], 1);
}

#[tokio::test]
async fn resolve_anonymous_is_401() {
    let app = app(AnonymousViewPolicy::PerSession).await;
    let (status, body) = send(
        &app,
        Method::POST,
        "/links/diff/resolve",
        &[("x-session-id", "s1")],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "not_authenticated");
}

#[tokio::test]
async fn differentiated_link_routes_by_rank() {
    let app = app(AnonymousViewPolicy::Reject).await;

    let ultra = bearer(&app.token("u1", Role::Ultra));
    let (_, body) = send(
        &app,
        Method::POST,
        "/links/diff/resolve",
        &[("authorization", &ultra)],
    )
    .await;
    assert_eq!(body["url"], "C");

    let member = bearer(&app.token("u2", Role::Member));
    let (_, body) = send(
        &app,
        Method::POST,
        "/links/diff/resolve",
        &[("authorization", &member)],
    )
    .await;
    assert_eq!(body["url"], "A");
    // Both land on the same link counter.
    assert_eq!(body["total_views"], 2);
}

#[tokio::test]
async fn misconfigured_link_is_5xx() {
    let app = app(AnonymousViewPolicy::Reject).await;
    let auth = bearer(&app.token("u1", Role::Ultra));
    let (status, body) = send(
        &app,
        Method::POST,
        "/links/broken/resolve",
        &[("authorization", &auth)],
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "unavailable");
}

#[tokio::test]
async fn anonymous_game_views_follow_policy() {
    let rejecting = app(AnonymousViewPolicy::Reject).await;
    let (status, _) = send(
        &rejecting,
        Method::POST,
        "/games/g1/views",
        &[("x-session-id", "s1")],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let counting = app(AnonymousViewPolicy::PerSession).await;
    let (status, body) = send(
        &counting,
        Method::POST,
        "/games/g1/views",
        &[("x-session-id", "s1")],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_new_view"], true);

    let (status, _) = send(&counting, Method::POST, "/games/g1/views", &[]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn report_not_gated_by_entitlement() {
    let app = app(AnonymousViewPolicy::Reject).await;
    let member = bearer(&app.token("u1", Role::Member));

    let (status, body) = send(
        &app,
        Method::POST,
        "/links/ultra/reports",
        &[("authorization", &member)],
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["accepted"], true);

    let (status, body) = send(
        &app,
        Method::POST,
        "/links/ultra/reports",
        &[("authorization", &member)],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], false);
}

#[tokio::test]
async fn report_requires_authentication() {
    let app = app(AnonymousViewPolicy::PerSession).await;
    let (status, _) = send(
        &app,
        Method::POST,
        "/links/free/reports",
        &[("x-session-id", "s1")],
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn review_queue_is_staff_only() {
    let app = app(AnonymousViewPolicy::Reject).await;
    let member = bearer(&app.token("u1", Role::Member));
    send(
        &app,
        Method::POST,
        "/games/g1/update-requests",
        &[("authorization", &member)],
    )
    .await;

    let (status, _) = send(
        &app,
        Method::GET,
        "/review/update-requests",
        &[("authorization", &member)],
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let moderator = bearer(&app.token("m1", Role::Moderator));
    let (status, body) = send(
        &app,
        Method::GET,
        "/review/update-requests?limit=10",
        &[("authorization", &moderator)],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let queue = body.as_array().unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0]["subject_id"], "g1");
    assert_eq!(queue[0]["principal_id"], "u1");
    assert_eq!(queue[0]["title"], "Hollow Pines");
    assert_eq!(queue[0]["access_tier"], "plus");
}

#[tokio::test]
async fn storage_outage_is_retryable_and_never_succeeds() {
    let app = app(AnonymousViewPolicy::Reject).await;
    let auth = bearer(&app.token("u1", Role::Ultra));
    app.db.pool().close().await;

    for (method, uri) in [
        (Method::POST, "/games/g1/update-requests"),
        (Method::POST, "/links/free/reports"),
        (Method::POST, "/links/free/resolve"),
        (Method::POST, "/games/g1/views"),
    ] {
        let resp = send_raw(&app, method, uri, &[("authorization", &auth)]).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE, "{uri}");
        assert_eq!(
            resp.headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
            Some("1"),
            "{uri}"
        );
    }
}
