//! Config API Handlers
//!
//! HTTP endpoints for config management.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use splice_core::domain::config::{Config, ConfigKind};
use splice_core::dto::config::{ConfigSummary, UpsertedConfig};

use crate::api::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListConfigsQuery {
    pub kind: Option<String>,
}

/// GET /api/configs?kind=
pub async fn list_configs(
    State(state): State<AppState>,
    Query(query): Query<ListConfigsQuery>,
) -> ApiResult<Json<Vec<ConfigSummary>>> {
    let kind = query
        .kind
        .as_deref()
        .map(str::parse::<ConfigKind>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    tracing::debug!("Listing configs (kind: {:?})", kind);

    let configs = state.service.list_configs(kind).await?;
    Ok(Json(configs.into_iter().map(ConfigSummary::from).collect()))
}

/// PUT /api/configs
/// Stores the body as a new revision of its id
pub async fn upsert_config(
    State(state): State<AppState>,
    Json(config): Json<Config>,
) -> ApiResult<(StatusCode, Json<UpsertedConfig>)> {
    tracing::info!("Upserting {} config {}", config.kind(), config.id());

    let upserted = state.service.upsert_config(config).await?;
    let status = if upserted.revision == 1 {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(upserted)))
}

/// GET /api/configs/{id}
pub async fn get_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Config>> {
    tracing::debug!("Getting config: {}", id);

    Ok(Json(state.service.get_config(&id).await?))
}

/// DELETE /api/configs/{id}
pub async fn delete_config(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting config: {}", id);

    state.service.delete_config(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
