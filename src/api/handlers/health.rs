//! Health check handlers

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::server::AppState;

/// Response for the basic health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

/// Basic health check endpoint.
///
/// Returns a simple health response without performing deep checks.
/// Use this for Kubernetes liveness probes.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "proclusive-workflow",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Readiness check endpoint.
///
/// Checks database connectivity when running against PostgreSQL.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let Some(pool) = state.pool.as_ref() else {
        return Ok(Json(serde_json::json!({
            "status": "ready",
            "database": { "connected": false, "backend": "memory" },
        })));
    };

    let start = std::time::Instant::now();
    match sqlx::query("SELECT 1").execute(pool).await {
        Ok(_) => Ok(Json(serde_json::json!({
            "status": "ready",
            "database": {
                "connected": true,
                "response_time_ms": start.elapsed().as_millis() as u64,
                "pool_size": pool.size(),
                "idle": pool.num_idle(),
            },
        }))),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            format!("Database unavailable: {}", e),
        )),
    }
}

/// Prometheus text exposition of the in-process metrics.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus().await,
    )
}
