//! Engine operations over stored or inline configs
//!
//! Resolves config references against the store, runs the matching
//! executor and persists repaired configs as new revisions.

use std::sync::Arc;

use serde_json::Value;
use splice_core::domain::config::{Config, ConfigKind};
use splice_core::domain::run::Run;
use splice_core::dto::config::{ConfigRef, UpsertedConfig};
use splice_core::dto::execute::{CallInput, CallResult, ExtractResult, TransformResult};
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::executor::{ConfigExecutor, Engine};
use crate::pipeline::{Pipeline, RunObserver, commit, resolve};
use crate::store::Store;

#[derive(Clone)]
pub struct SpliceService {
    engine: Arc<Engine>,
    store: Arc<dyn Store>,
    pipeline: Pipeline,
}

fn wrong_kind(config: &Config, expected: ConfigKind) -> EngineError {
    EngineError::WrongKind {
        id: config.id().to_string(),
        expected,
        found: config.kind(),
    }
}

impl SpliceService {
    pub fn new(engine: Arc<Engine>, store: Arc<dyn Store>) -> Self {
        let pipeline = Pipeline::new(engine.clone(), store.clone());
        Self {
            engine,
            store,
            pipeline,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.pipeline = self.pipeline.with_observer(observer);
        self
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub async fn execute_call(&self, reference: ConfigRef, input: CallInput) -> Result<CallResult> {
        let original = resolve(self.store.as_ref(), reference).await?;
        let Config::Api(api) = original.clone() else {
            return Err(wrong_kind(&original, ConfigKind::Api));
        };

        let mut result = self.engine.execute_call(api, &input).await?;
        let revision = commit(self.store.as_ref(), &original, Config::Api(result.config.clone())).await?;
        result.config.meta.revision = revision;
        Ok(result)
    }

    pub async fn execute_extract(&self, reference: ConfigRef, input: Value) -> Result<ExtractResult> {
        let original = resolve(self.store.as_ref(), reference).await?;
        let Config::Extract(extract) = original.clone() else {
            return Err(wrong_kind(&original, ConfigKind::Extract));
        };

        let mut result = self.engine.execute_extract(extract, &input).await?;
        let revision =
            commit(self.store.as_ref(), &original, Config::Extract(result.config.clone())).await?;
        result.config.meta.revision = revision;
        Ok(result)
    }

    pub async fn execute_transform(
        &self,
        reference: ConfigRef,
        input: Value,
    ) -> Result<TransformResult> {
        let original = resolve(self.store.as_ref(), reference).await?;
        let Config::Transform(transform) = original.clone() else {
            return Err(wrong_kind(&original, ConfigKind::Transform));
        };

        let mut result = self.engine.execute_transform(transform, &input).await?;
        let revision =
            commit(self.store.as_ref(), &original, Config::Transform(result.config.clone())).await?;
        result.config.meta.revision = revision;
        Ok(result)
    }

    pub async fn run_pipeline(&self, steps: Vec<ConfigRef>, input: CallInput) -> Result<Run> {
        self.pipeline.run(steps, input).await
    }

    pub async fn generate_schema(&self, instruction: &str, sample: &Value) -> Result<Value> {
        self.engine.generate_schema(instruction, sample).await
    }

    // ========================================================================
    // Config and run access
    // ========================================================================

    pub async fn upsert_config(&self, config: Config) -> Result<UpsertedConfig> {
        let id = config.id().to_string();
        if id.trim().is_empty() {
            return Err(EngineError::InvalidPipeline("config id cannot be empty".into()));
        }
        let revision = self.store.put_config(config).await?;
        Ok(UpsertedConfig { id, revision })
    }

    pub async fn get_config(&self, id: &str) -> Result<Config> {
        self.store
            .get_config(id)
            .await?
            .ok_or_else(|| EngineError::ConfigNotFound(id.to_string()))
    }

    pub async fn delete_config(&self, id: &str) -> Result<()> {
        if self.store.delete_config(id).await? {
            Ok(())
        } else {
            Err(EngineError::ConfigNotFound(id.to_string()))
        }
    }

    pub async fn list_configs(&self, kind: Option<ConfigKind>) -> Result<Vec<Config>> {
        Ok(self.store.list_configs(kind).await?)
    }

    pub async fn get_run(&self, id: Uuid) -> Result<Option<Run>> {
        Ok(self.store.get_run(id).await?)
    }

    pub async fn list_runs(&self) -> Result<Vec<Run>> {
        Ok(self.store.list_runs().await?)
    }
}
