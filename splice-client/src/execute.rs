//! Execution endpoints

use crate::SpliceClient;
use crate::error::Result;
use serde_json::Value;
use splice_core::domain::run::Run;
use splice_core::dto::config::ConfigRef;
use splice_core::dto::execute::{
    CallInput, CallResult, ExecuteCall, ExecuteExtract, ExecuteTransform, ExtractResult,
    GenerateSchema, GeneratedSchema, RunPipeline, TransformResult,
};

impl SpliceClient {
    // =============================================================================
    // Executors
    // =============================================================================

    /// Execute an API call config, repairing it if the upstream rejects it
    pub async fn execute_call(&self, config: ConfigRef, input: CallInput) -> Result<CallResult> {
        let url = format!("{}/api/call", self.base_url);
        let req = ExecuteCall { config, input };
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    pub async fn execute_extract(&self, config: ConfigRef, input: Value) -> Result<ExtractResult> {
        let url = format!("{}/api/extract", self.base_url);
        let req = ExecuteExtract { config, input };
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    pub async fn execute_transform(
        &self,
        config: ConfigRef,
        input: Value,
    ) -> Result<TransformResult> {
        let url = format!("{}/api/transform", self.base_url);
        let req = ExecuteTransform { config, input };
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Pipelines
    // =============================================================================

    /// Run an ordered list of steps
    ///
    /// Step failures do not produce an error here; they are reported in the
    /// returned run's status and step records.
    pub async fn run_pipeline(&self, steps: Vec<ConfigRef>, input: CallInput) -> Result<Run> {
        let url = format!("{}/api/pipeline/run", self.base_url);
        let req = RunPipeline { steps, input };
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Ask the server to infer a JSON Schema for a sample document
    pub async fn generate_schema(
        &self,
        instruction: impl Into<String>,
        sample: Value,
    ) -> Result<Value> {
        let url = format!("{}/api/schema/generate", self.base_url);
        let req = GenerateSchema {
            instruction: instruction.into(),
            sample,
        };
        let response = self.client.post(&url).json(&req).send().await?;

        let generated: GeneratedSchema = self.handle_response(response).await?;
        Ok(generated.schema)
    }
}
