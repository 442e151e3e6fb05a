//! Health check endpoint

use axum::{Json, extract::State};

use crate::api::{state::ApiState, types::HealthResponse};

/// GET /api/health
///
/// Reports store health and the number of fetches in progress
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let storage_healthy = state
        .store
        .health_check()
        .await
        .map(|health| health.healthy)
        .unwrap_or(false);

    Json(HealthResponse {
        status: if storage_healthy { "ok" } else { "degraded" }.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        storage_healthy,
        in_flight: state.scheduler.as_ref().map(|s| s.in_flight()),
    })
}
