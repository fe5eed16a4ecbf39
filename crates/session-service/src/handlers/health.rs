//! Health check handler.
//!
//! `/api/health` always answers 200. A failing check shows up as
//! `status: "degraded"` with a `reason`, never as an error response.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use std::sync::Arc;

/// Handler for GET /api/health
#[tracing::instrument(skip_all, name = "session.health")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = state.health.status().await;

    Json(HealthResponse {
        status: if status.healthy { "healthy" } else { "degraded" }.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        environment_info: status.checks,
        uptime: format!("{}s", status.uptime_secs),
        reason: status.reason,
    })
}
