//! Config executors
//!
//! One executor per config kind. Each takes a config and its input and
//! returns either the step output or a structured failure. Repairable
//! failures are routed through the [`RepairLoop`] before being reported;
//! the returned result carries the config that finally succeeded.

mod call;
mod extract;
mod transform;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use splice_core::domain::config::{ApiConfig, ExtractConfig, TransformConfig};
use splice_core::dto::execute::{CallInput, CallResult, ExtractResult, TransformResult};
use splice_lua::ModuleRegistry;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::http::{HttpClient, ReqwestHttpClient};
use crate::oracle::{OpenAiOracle, Oracle, ResponseFormat};
use crate::repair::{GenerationTask, RepairLoop};

/// Largest array prefix shown to the oracle
const SAMPLE_ITEMS: usize = 5;

/// Executes one config of each kind
#[async_trait]
pub trait ConfigExecutor: Send + Sync {
    async fn execute_call(&self, config: ApiConfig, input: &CallInput) -> Result<CallResult>;

    async fn execute_extract(&self, config: ExtractConfig, input: &Value)
    -> Result<ExtractResult>;

    async fn execute_transform(
        &self,
        config: TransformConfig,
        input: &Value,
    ) -> Result<TransformResult>;
}

/// Default executor backed by an oracle and an HTTP client
#[derive(Clone)]
pub struct Engine {
    http: Arc<dyn HttpClient>,
    oracle: Arc<dyn Oracle>,
    repair: RepairLoop,
    modules: Arc<ModuleRegistry>,
    model: String,
    schema_model: String,
    max_pages: u32,
    expression_timeout: Duration,
}

impl Engine {
    pub fn new(oracle: Arc<dyn Oracle>, http: Arc<dyn HttpClient>, config: &EngineConfig) -> Self {
        let repair = RepairLoop::new(oracle.clone(), config.retry_policy(), config.temperature_ramp())
            .with_timeout(config.oracle_timeout);

        Self {
            http,
            oracle,
            repair,
            modules: Arc::new(ModuleRegistry::with_builtins()),
            model: config.model.clone(),
            schema_model: config.schema_model.clone(),
            max_pages: config.max_pages,
            expression_timeout: config.expression_timeout,
        }
    }

    /// Builds the OpenAI oracle and reqwest client described by `config`
    pub fn from_config(config: &EngineConfig) -> anyhow::Result<Self> {
        let oracle = OpenAiOracle::new(&config.api_base_url, &config.api_key, config.oracle_timeout)?;
        let http = ReqwestHttpClient::new(config.http_timeout)?;
        Ok(Self::new(Arc::new(oracle), Arc::new(http), config))
    }

    /// Replaces the helper modules available to mapping expressions
    pub fn with_modules(mut self, modules: ModuleRegistry) -> Self {
        self.modules = Arc::new(modules);
        self
    }

    pub fn oracle(&self) -> &Arc<dyn Oracle> {
        &self.oracle
    }

    pub fn repair_loop(&self) -> &RepairLoop {
        &self.repair
    }

    pub fn schema_model(&self) -> &str {
        &self.schema_model
    }

    fn task(&self, label: String, system: String, instruction: &str, subject: Value) -> GenerationTask {
        GenerationTask {
            label,
            system,
            instruction: instruction.to_string(),
            subject: Some(subject),
            model: self.model.clone(),
            response_format: ResponseFormat::JsonObject,
        }
    }
}

#[async_trait]
impl ConfigExecutor for Engine {
    async fn execute_call(&self, config: ApiConfig, input: &CallInput) -> Result<CallResult> {
        call::execute(self, config, input).await
    }

    async fn execute_extract(
        &self,
        config: ExtractConfig,
        input: &Value,
    ) -> Result<ExtractResult> {
        extract::execute(self, config, input).await
    }

    async fn execute_transform(
        &self,
        config: TransformConfig,
        input: &Value,
    ) -> Result<TransformResult> {
        transform::execute(self, config, input).await
    }
}
