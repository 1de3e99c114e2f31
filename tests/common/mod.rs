#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::Value;
use std::time::Duration;
use tokengate::{ServerConfig, create_app, db::Database, jwt::TokenIssuer};
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    /// Issuer sharing the app's secret and lifetimes, for minting tokens directly.
    pub issuer: TokenIssuer,
}

/// Create a test app with the default 30m / 30d lifetimes.
pub async fn create_test_app() -> TestApp {
    create_test_app_with_ttl(Duration::from_secs(30 * 60), Duration::from_secs(30 * 86400)).await
}

pub async fn create_test_app_with_ttl(access_ttl: Duration, refresh_ttl: Duration) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = test_config(db.clone(), access_ttl, refresh_ttl);
    TestApp {
        app: create_app(&config),
        db,
        issuer: TokenIssuer::new(TEST_SECRET, access_ttl, refresh_ttl),
    }
}

pub fn test_config(db: Database, access_ttl: Duration, refresh_ttl: Duration) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: TEST_SECRET.to_vec(),
        access_ttl,
        refresh_ttl,
        // Cheap hashing keeps the suite fast
        password_params: argon2::Params::new(1024, 1, 1, None).expect("Invalid argon2 params"),
    }
}

/// Send one request through a clone of the router and decode the JSON response.
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Response is not JSON")
    };
    (status, json)
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

/// Tokens and user id as returned by register or login.
pub struct Session {
    pub user_id: String,
    pub access: String,
    pub refresh: String,
}

impl Session {
    pub fn from_data(data: &Value) -> Self {
        Session {
            user_id: data["user"]["id"].as_str().unwrap().to_string(),
            access: data["tokens"]["access"]["token"].as_str().unwrap().to_string(),
            refresh: data["tokens"]["refresh"]["token"].as_str().unwrap().to_string(),
        }
    }
}

pub async fn register(app: &Router, email: &str, password: &str, name: &str) -> Session {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({ "email": email, "password": password, "name": name }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    Session::from_data(&body["data"])
}

pub async fn login(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            "POST",
            "/api/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        ),
    )
    .await
}

pub async fn refresh(app: &Router, refresh_token: &str) -> (StatusCode, Value) {
    send(
        app,
        json_request(
            "POST",
            "/api/auth/refresh-token",
            serde_json::json!({ "refreshToken": refresh_token }),
        ),
    )
    .await
}
