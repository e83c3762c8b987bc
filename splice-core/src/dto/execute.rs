//! Execution DTOs
//!
//! Inputs and results of the single-step operations, the pipeline run and
//! schema generation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::config::{ApiConfig, ExtractConfig, TransformConfig};
use crate::dto::config::ConfigRef;

/// Variable bindings available to a call
///
/// Template placeholders resolve against `credentials` first, then against
/// the top-level fields of `payload`. When a pipeline starts with an extract
/// or transform step, `payload` is that step's input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallInput {
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
}

impl CallInput {
    pub fn from_payload(payload: Value) -> Self {
        Self {
            payload,
            credentials: BTreeMap::new(),
        }
    }
}

/// Output of the call executor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    /// Aggregated response payload
    pub data: Value,
    /// Status of the last response
    pub status: u16,
    /// Resolved URL of the first request
    pub url: String,
    pub pages: u32,
    pub duration_ms: u64,
    /// Config revision that produced this result
    pub config: ApiConfig,
    /// Oracle calls spent generating or repairing the config
    pub retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResult {
    pub data: Value,
    pub config: ExtractConfig,
    pub retries: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformResult {
    pub data: Value,
    pub config: TransformConfig,
    pub retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteCall {
    pub config: ConfigRef,
    #[serde(default)]
    pub input: CallInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteExtract {
    pub config: ConfigRef,
    #[serde(default)]
    pub input: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteTransform {
    pub config: ConfigRef,
    #[serde(default)]
    pub input: Value,
}

/// Request to run a sequence of steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPipeline {
    pub steps: Vec<ConfigRef>,
    #[serde(default)]
    pub input: CallInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSchema {
    pub instruction: String,
    #[serde(default)]
    pub sample: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedSchema {
    pub schema: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_input_defaults() {
        let request: ExecuteCall =
            serde_json::from_str(r#"{"config": {"stored": "weather"}}"#).unwrap();
        assert_eq!(request.input.payload, Value::Null);
        assert!(request.input.credentials.is_empty());
    }

    #[test]
    fn test_run_pipeline_parses_mixed_refs() {
        let request: RunPipeline = serde_json::from_value(serde_json::json!({
            "steps": [
                {"stored": "weather-call"},
                {"inline": {
                    "kind": "transform",
                    "id": "to-celsius",
                    "instruction": "convert",
                    "schema": {"type": "object"}
                }}
            ],
            "input": {"payload": {"city": "Paris"}}
        }))
        .unwrap();

        assert_eq!(request.steps.len(), 2);
        assert_eq!(request.input.payload["city"], "Paris");
    }
}
