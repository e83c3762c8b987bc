//! Execution API Handlers
//!
//! Endpoints that run executors, pipelines and schema generation.

use axum::{Json, extract::State};
use splice_core::domain::run::Run;
use splice_core::dto::execute::{
    CallResult, ExecuteCall, ExecuteExtract, ExecuteTransform, ExtractResult, GenerateSchema,
    GeneratedSchema, RunPipeline, TransformResult,
};

use crate::api::error::ApiResult;
use crate::state::AppState;

/// POST /api/call
pub async fn execute_call(
    State(state): State<AppState>,
    Json(req): Json<ExecuteCall>,
) -> ApiResult<Json<CallResult>> {
    tracing::info!("Executing call");

    Ok(Json(state.service.execute_call(req.config, req.input).await?))
}

/// POST /api/extract
pub async fn execute_extract(
    State(state): State<AppState>,
    Json(req): Json<ExecuteExtract>,
) -> ApiResult<Json<ExtractResult>> {
    tracing::info!("Executing extract");

    Ok(Json(state.service.execute_extract(req.config, req.input).await?))
}

/// POST /api/transform
pub async fn execute_transform(
    State(state): State<AppState>,
    Json(req): Json<ExecuteTransform>,
) -> ApiResult<Json<TransformResult>> {
    tracing::info!("Executing transform");

    Ok(Json(state.service.execute_transform(req.config, req.input).await?))
}

/// POST /api/pipeline/run
/// Returns the finalized run, whatever its status
pub async fn run_pipeline(
    State(state): State<AppState>,
    Json(req): Json<RunPipeline>,
) -> ApiResult<Json<Run>> {
    tracing::info!("Running pipeline with {} step(s)", req.steps.len());

    Ok(Json(state.service.run_pipeline(req.steps, req.input).await?))
}

/// POST /api/schema/generate
pub async fn generate_schema(
    State(state): State<AppState>,
    Json(req): Json<GenerateSchema>,
) -> ApiResult<Json<GeneratedSchema>> {
    tracing::info!("Generating schema for: {}", req.instruction);

    let schema = state
        .service
        .generate_schema(&req.instruction, &req.sample)
        .await?;
    Ok(Json(GeneratedSchema { schema }))
}
