//! API Module
//!
//! HTTP API layer for the splice server.
//! Each submodule handles endpoints for a specific domain.

pub mod configs;
pub mod error;
pub mod execute;
pub mod health;
pub mod runs;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Execution endpoints
        .route("/api/call", post(execute::execute_call))
        .route("/api/extract", post(execute::execute_extract))
        .route("/api/transform", post(execute::execute_transform))
        .route("/api/pipeline/run", post(execute::run_pipeline))
        .route("/api/schema/generate", post(execute::generate_schema))
        // Config endpoints
        .route(
            "/api/configs",
            get(configs::list_configs).put(configs::upsert_config),
        )
        .route(
            "/api/configs/{id}",
            get(configs::get_config).delete(configs::delete_config),
        )
        // Run endpoints
        .route("/api/runs", get(runs::list_runs))
        .route("/api/runs/{id}", get(runs::get_run))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
