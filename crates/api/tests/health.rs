mod common;

use axum::http::StatusCode;

use common::{body_json, get, test_app};

#[tokio::test]
async fn health_returns_ok_without_auth() {
    let (app, _store) = test_app();

    let response = get(&app, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn db_health_reports_store_reachability() {
    let (app, _store) = test_app();

    let response = get(&app, "/health/db", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["db_healthy"], true);
}
