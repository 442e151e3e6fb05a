//! Target registration and history endpoints

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::{error, info};

use crate::{
    api::{
        error::{ApiError, ApiResult},
        state::ApiState,
        types::{CreateTargetRequest, CreatedResponse, HistoryResponse, TargetResponse},
    },
    storage::TargetId,
};

/// Parse a path segment into a target id
///
/// Only positive integers are valid ids.
fn parse_target_id(raw: &str) -> ApiResult<TargetId> {
    match raw.parse::<TargetId>() {
        Ok(id) if id > 0 => Ok(id),
        _ => {
            error!(id = raw, "provided id is not a positive integer");
            Err(ApiError::InvalidRequest(format!(
                "provided id \"{raw}\" is not a positive integer"
            )))
        }
    }
}

/// GET /api/fetcher
///
/// List all registered targets
pub async fn list_targets(State(state): State<ApiState>) -> ApiResult<Json<Vec<TargetResponse>>> {
    let targets = state.store.list_targets().await?;

    Ok(Json(targets.into_iter().map(TargetResponse::from).collect()))
}

/// POST /api/fetcher
///
/// Register a new target
pub async fn create_target(
    State(state): State<ApiState>,
    payload: Result<Json<CreateTargetRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreatedResponse>)> {
    let Json(request) = payload.inspect_err(|e| error!("error creating new target: {e}"))?;

    info!(url = %request.url, interval = request.interval, "target data received from API");

    let target = state.store.create_target(request.into()).await?;

    Ok((StatusCode::CREATED, Json(CreatedResponse { id: target.id })))
}

/// DELETE /api/fetcher/:id
///
/// Delete a target and its history
pub async fn delete_target(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_target_id(&raw_id)?;

    info!(id, "deleting target");
    state.store.delete_target(id).await?;

    Ok(StatusCode::OK)
}

/// GET /api/fetcher/:id/history
///
/// Every recorded response of a target, oldest first
pub async fn get_history(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<Vec<HistoryResponse>>> {
    let id = parse_target_id(&raw_id)?;

    let history = state.store.list_history(id).await?;

    Ok(Json(history.into_iter().map(HistoryResponse::from).collect()))
}
