//! Integration tests for cinescope-web API endpoints
//!
//! Upstream services (catalog, identity provider, document store) are
//! not reachable from tests, so coverage focuses on everything the
//! server decides locally: routing, validation, session handling, and
//! error shapes. Session rows are inserted directly with far-future
//! token expiry so the middleware never attempts a refresh.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use std::time::Duration as StdDuration;
use tower::util::ServiceExt; // for `oneshot` method
use uuid::Uuid;

use cinescope_web::firebase::auth::FirebaseAuthClient;
use cinescope_web::firebase::firestore::FirestoreClient;
use cinescope_web::tmdb::TmdbClient;
use cinescope_web::{build_router, AppState};

/// Test helper: fresh database in a temp directory
async fn setup_test_db() -> (SqlitePool, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("Should create temp dir");
    let db_path = dir.path().join("cinescope.db");

    let pool = cinescope_common::db::init_database(&db_path)
        .await
        .expect("Should initialize database");

    (pool, dir)
}

/// Test helper: app with dummy upstream credentials
fn setup_app(db: SqlitePool) -> axum::Router {
    let timeout = StdDuration::from_secs(5);

    let tmdb = TmdbClient::new("test-tmdb-key".to_string(), "en-US".to_string(), timeout)
        .expect("Should build TMDB client");
    let auth = FirebaseAuthClient::new("test-firebase-key".to_string(), timeout)
        .expect("Should build auth client");
    let firestore = FirestoreClient::new("test-project".to_string(), timeout)
        .expect("Should build document store client");

    build_router(AppState::new(db, tmdb, auth, firestore))
}

/// Test helper: insert a session row directly
///
/// Token expiry is set a day out so the middleware skips the refresh
/// path entirely.
async fn insert_session(db: &SqlitePool, last_used_offset_seconds: i64) -> Uuid {
    let guid = Uuid::new_v4();
    let now = Utc::now();
    let last_used = now - Duration::seconds(last_used_offset_seconds);

    sqlx::query(
        r#"
        INSERT INTO sessions (
            guid, uid, email, id_token, refresh_token,
            token_expires_at, created_at, last_used_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(guid.to_string())
    .bind("test-uid-1")
    .bind("user@example.com")
    .bind("test-id-token")
    .bind("test-refresh-token")
    .bind((now + Duration::days(1)).to_rfc3339())
    .bind(now.to_rfc3339())
    .bind(last_used.to_rfc3339())
    .execute(db)
    .await
    .expect("Should insert session");

    guid
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn get_with_session(uri: &str, guid: Uuid) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, format!("session_id={}", guid))
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: &str, uri: &str, guid: Option<Uuid>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");

    if let Some(guid) = guid {
        builder = builder.header(header::COOKIE, format!("session_id={}", guid));
    }

    builder.body(Body::from(body.to_string())).unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Health and public catalog metadata
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    let response = app.oneshot(get_request("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "cinescope-web");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_genres_listing() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    let response = app.oneshot(get_request("/api/genres")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let genres = body.as_array().expect("Should be an array");
    assert_eq!(genres.len(), 11);
    assert!(genres.iter().any(|g| g["name"] == "Science Fiction" && g["id"] == 878));
}

#[tokio::test]
async fn test_ui_served_at_root() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    let response = app.oneshot(get_request("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(content_type.starts_with("text/html"));
}

// =============================================================================
// Request validation (rejected before any upstream call)
// =============================================================================

#[tokio::test]
async fn test_search_rejects_empty_query() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    let response = app
        .oneshot(get_request("/api/search?query=%20%20"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_search_requires_query_param() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    let response = app.oneshot(get_request("/api/search")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_discover_rejects_unknown_genre() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    let response = app
        .oneshot(get_request("/api/movies/discover?genre_id=99999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_register_rejects_mismatched_passwords() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    let request = json_request(
        "POST",
        "/api/auth/register",
        None,
        json!({
            "email": "user@example.com",
            "password": "secret1",
            "confirm_password": "secret2",
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_rejects_short_password() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    let request = json_request(
        "POST",
        "/api/auth/register",
        None,
        json!({
            "email": "user@example.com",
            "password": "abc",
            "confirm_password": "abc",
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_rejects_invalid_email() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    let request = json_request(
        "POST",
        "/api/auth/login",
        None,
        json!({
            "email": "not-an-email",
            "password": "secret1",
        }),
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Session middleware
// =============================================================================

#[tokio::test]
async fn test_protected_routes_require_session() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    for uri in ["/api/ratings", "/api/ratings/550", "/api/auth/session"] {
        let response = app.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "expected 401 for {}",
            uri
        );
    }
}

#[tokio::test]
async fn test_garbage_session_cookie_rejected() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    let request = Request::builder()
        .method("GET")
        .uri("/api/auth/session")
        .header(header::COOKIE, "session_id=not-a-uuid")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_session_id_rejected() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    let response = app
        .oneshot(get_with_session("/api/auth/session", Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_valid_session_returns_user() {
    let (db, _dir) = setup_test_db().await;
    let guid = insert_session(&db, 0).await;
    let app = setup_app(db);

    let response = app
        .oneshot(get_with_session("/api/auth/session", guid))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["uid"], "test-uid-1");
    assert_eq!(body["email"], "user@example.com");
}

#[tokio::test]
async fn test_idle_session_expires() {
    let (db, _dir) = setup_test_db().await;

    // Idle for 40 days; default timeout is 30 days
    let guid = insert_session(&db, 40 * 24 * 3600).await;
    let app = setup_app(db.clone());

    let response = app
        .oneshot(get_with_session("/api/auth/session", guid))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The dead row is removed, not just rejected
    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions WHERE guid = ?")
        .bind(guid.to_string())
        .fetch_one(&db)
        .await
        .unwrap();
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn test_session_activity_updates_last_used() {
    let (db, _dir) = setup_test_db().await;

    // One hour idle, well inside the timeout
    let guid = insert_session(&db, 3600).await;
    let app = setup_app(db.clone());

    let response = app
        .oneshot(get_with_session("/api/auth/session", guid))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let last_used: String = sqlx::query_scalar("SELECT last_used_at FROM sessions WHERE guid = ?")
        .bind(guid.to_string())
        .fetch_one(&db)
        .await
        .unwrap();
    let last_used = chrono::DateTime::parse_from_rfc3339(&last_used).unwrap();

    assert!(Utc::now() - last_used.with_timezone(&Utc) < Duration::seconds(10));
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let (db, _dir) = setup_test_db().await;
    let guid = insert_session(&db, 0).await;
    let app = setup_app(db);

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .header(header::COOKIE, format!("session_id={}", guid))
        .body(Body::empty())
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(set_cookie.contains("Max-Age=0"));

    // The same cookie no longer works
    let response = app
        .oneshot(get_with_session("/api/auth/session", guid))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Rating validation
// =============================================================================

#[tokio::test]
async fn test_rating_out_of_range_rejected() {
    let (db, _dir) = setup_test_db().await;
    let guid = insert_session(&db, 0).await;
    let app = setup_app(db);

    for bad_rating in [0, 11, -5] {
        let request = json_request(
            "PUT",
            "/api/ratings/550",
            Some(guid),
            json!({ "rating": bad_rating }),
        );

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "expected 400 for rating {}",
            bad_rating
        );
    }
}

#[tokio::test]
async fn test_rating_without_session_rejected() {
    let (db, _dir) = setup_test_db().await;
    let app = setup_app(db);

    let request = json_request("PUT", "/api/ratings/550", None, json!({ "rating": 8 }));

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
