use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
}

/// GET /health -- liveness probe, no dependencies touched.
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Database health response payload.
#[derive(Serialize)]
pub struct DbHealthResponse {
    pub status: &'static str,
    pub db_healthy: bool,
}

/// GET /health/db -- readiness probe, pings the booking store.
async fn db_health_check(State(state): State<AppState>) -> (StatusCode, Json<DbHealthResponse>) {
    let db_healthy = state.store.ping().await.is_ok();

    if db_healthy {
        (
            StatusCode::OK,
            Json(DbHealthResponse {
                status: "ok",
                db_healthy,
            }),
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(DbHealthResponse {
                status: "degraded",
                db_healthy,
            }),
        )
    }
}

/// Mount health check routes (intended for root-level, NOT under `/api/v1`).
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/db", get(db_health_check))
}
