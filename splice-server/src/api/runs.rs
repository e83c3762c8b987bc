//! Run API Handlers

use axum::{
    Json,
    extract::{Path, State},
};
use splice_core::domain::run::Run;
use uuid::Uuid;

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/runs
pub async fn list_runs(State(state): State<AppState>) -> ApiResult<Json<Vec<Run>>> {
    tracing::debug!("Listing runs");

    Ok(Json(state.service.list_runs().await?))
}

/// GET /api/runs/{id}
pub async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Run>> {
    tracing::debug!("Getting run: {}", id);

    state
        .service
        .get_run(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Run {} not found", id)))
}
