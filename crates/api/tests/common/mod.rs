use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use carpool_api::auth::{generate_access_token, JwtConfig};
use carpool_api::config::ServerConfig;
use carpool_api::identity::IdentityClient;
use carpool_api::router::build_app_router;
use carpool_api::state::AppState;
use carpool_core::types::DbId;
use carpool_db::store::MemoryBookingStore;

/// Build a test `ServerConfig` with safe defaults and a fixed JWT secret.
///
/// The identity service URL points at a closed port so profile decoration
/// degrades to `null` profiles instead of hanging.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        auth_service_url: "http://127.0.0.1:1".to_string(),
        jwt: JwtConfig {
            secret: "integration-test-secret-long-enough".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Build the full application router over a fresh in-memory store.
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (CORS, request ID, timeout, tracing,
/// panic recovery) that production uses. The store is also returned so
/// tests can inspect or seed state directly.
pub fn test_app() -> (Router, Arc<MemoryBookingStore>) {
    let config = test_config();
    let store = Arc::new(MemoryBookingStore::new());

    let state = AppState {
        store: store.clone(),
        config: Arc::new(config.clone()),
        identity: Arc::new(IdentityClient::new(config.auth_service_url.clone())),
    };

    (build_app_router(state, &config), store)
}

/// Mint a Bearer token for the given user id.
pub fn bearer(user_id: DbId) -> String {
    let config = test_config();
    generate_access_token(user_id, "user", &config.jwt)
        .expect("token generation should succeed")
}

/// Send one request through the router.
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request should build"),
        None => builder.body(Body::empty()).expect("request should build"),
    };

    app.clone()
        .oneshot(request)
        .await
        .expect("request should not fail at the transport level")
}

pub async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response {
    send(app, Method::GET, uri, token, None).await
}

pub async fn post_json(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Response {
    send(app, Method::POST, uri, token, Some(body)).await
}

pub async fn put_json(app: &Router, uri: &str, token: Option<&str>, body: Value) -> Response {
    send(app, Method::PUT, uri, token, Some(body)).await
}

pub async fn delete(app: &Router, uri: &str, token: Option<&str>) -> Response {
    send(app, Method::DELETE, uri, token, None).await
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}
