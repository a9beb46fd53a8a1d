//! Shared helpers for the API integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::{Duration, TimeZone, Utc};
use crm_core::locking::LockHolder;
use crm_core::types::Timestamp;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use crm_api::auth::jwt::{generate_access_token, JwtConfig};
use crm_api::config::ServerConfig;
use crm_api::lock_store::LockStore;
use crm_api::router::build_app_router;
use crm_api::state::AppState;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-long-enough-for-hs256";

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        lock_purge_interval_secs: 60,
        jwt: JwtConfig {
            secret: TEST_JWT_SECRET.to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router with all middleware layers over the
/// given lock store.
pub fn build_test_app_with(locks: Arc<LockStore>) -> Router {
    let config = test_config();
    let state = AppState {
        config: Arc::new(config.clone()),
        locks,
    };
    build_app_router(state, &config)
}

/// Router over a fresh store on the system clock.
pub fn build_test_app() -> Router {
    build_test_app_with(Arc::new(LockStore::new()))
}

/// A test-controlled clock for driving lock expiry.
#[derive(Clone)]
pub struct TestClock(Arc<Mutex<Timestamp>>);

impl TestClock {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        )))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }

    /// A lock store driven by this clock.
    pub fn store(&self) -> Arc<LockStore> {
        let now = Arc::clone(&self.0);
        Arc::new(LockStore::with_clock(Arc::new(move || {
            *now.lock().unwrap()
        })))
    }
}

/// A signed-in test user.
pub struct TestUser {
    pub holder: LockHolder,
    pub token: String,
}

pub fn user(name: &str, role: &str) -> TestUser {
    let holder = LockHolder {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
    };
    let token = generate_access_token(&holder, role, &test_config().jwt).unwrap();
    TestUser { holder, token }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
