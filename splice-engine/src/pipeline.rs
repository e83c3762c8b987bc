//! Pipeline orchestrator
//!
//! Runs an ordered subset of Call -> Extract -> Transform, feeding each
//! step's output into the next. The orchestrator is the only writer of its
//! [`Run`]: the record is persisted when the run is created, at every step
//! boundary, and once more when it is finalized.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use splice_core::domain::config::{Config, ConfigKind};
use splice_core::domain::run::{Run, StepKind, StepRecord, StepStatus};
use splice_core::dto::config::ConfigRef;
use splice_core::dto::execute::CallInput;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use crate::error::{EngineError, Result};
use crate::executor::ConfigExecutor;
use crate::store::Store;

/// Notified once per finalized run
pub trait RunObserver: Send + Sync {
    fn on_run_finished(&self, run: &Run);
}

/// Observer that ignores every run
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {
    fn on_run_finished(&self, _run: &Run) {}
}

pub fn step_kind(kind: ConfigKind) -> StepKind {
    match kind {
        ConfigKind::Api => StepKind::Call,
        ConfigKind::Extract => StepKind::Extract,
        ConfigKind::Transform => StepKind::Transform,
    }
}

/// sha256 of the canonical JSON encoding
pub fn input_digest(input: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Loads a stored config or passes an inline one through
pub async fn resolve(store: &dyn Store, reference: ConfigRef) -> Result<Config> {
    match reference {
        ConfigRef::Inline(config) => Ok(config),
        ConfigRef::Stored(id) => store
            .get_config(&id)
            .await?
            .ok_or(EngineError::ConfigNotFound(id)),
    }
}

/// Persists `used` as a new revision when it differs from `original`
///
/// Returns the revision the step actually ran with.
pub async fn commit(store: &dyn Store, original: &Config, used: Config) -> Result<u32> {
    if &used == original {
        return Ok(original.revision());
    }
    let revision = store.put_config(used).await?;
    info!("Stored revision {} of config {}", revision, original.id());
    Ok(revision)
}

/// Checks that steps follow Call < Extract < Transform without repeats
fn check_order(configs: &[Config]) -> Result<()> {
    if configs.is_empty() {
        return Err(EngineError::InvalidPipeline("a pipeline needs at least one step".into()));
    }
    for pair in configs.windows(2) {
        let (a, b) = (step_kind(pair[0].kind()), step_kind(pair[1].kind()));
        if a >= b {
            return Err(EngineError::InvalidPipeline(format!(
                "step {} cannot follow step {}",
                b, a
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Cancellation guard
// ============================================================================

/// Owns the in-flight run; finalizes it if the pipeline future is dropped
struct RunGuard {
    run: Run,
    released: bool,
    store: Arc<dyn Store>,
    observer: Arc<dyn RunObserver>,
}

impl RunGuard {
    fn new(store: Arc<dyn Store>, observer: Arc<dyn RunObserver>) -> Self {
        Self {
            run: Run::new(),
            released: false,
            store,
            observer,
        }
    }

    fn release(mut self) -> Run {
        self.released = true;
        std::mem::take(&mut self.run)
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.released || self.run.is_finished() {
            return;
        }

        let mut run = std::mem::take(&mut self.run);
        run.finish_abandoned("run cancelled before completion");
        warn!("Run {} abandoned with status {}", run.id, run.status);

        let Ok(handle) = Handle::try_current() else {
            error!("Run {} abandoned outside a runtime; final state not stored", run.id);
            return;
        };
        let store = self.store.clone();
        let observer = self.observer.clone();
        handle.spawn(async move {
            if let Err(e) = store.put_run(&run).await {
                error!("Failed to store abandoned run {}: {}", run.id, e);
            }
            observer.on_run_finished(&run);
        });
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

#[derive(Clone)]
pub struct Pipeline {
    executor: Arc<dyn ConfigExecutor>,
    store: Arc<dyn Store>,
    observer: Arc<dyn RunObserver>,
}

impl Pipeline {
    pub fn new(executor: Arc<dyn ConfigExecutor>, store: Arc<dyn Store>) -> Self {
        Self {
            executor,
            store,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Runs `steps` and returns the finalized run
    ///
    /// Step failures end up in the returned run. Only store failures are
    /// returned as errors, since the run can no longer be recorded.
    pub async fn run(&self, steps: Vec<ConfigRef>, input: CallInput) -> Result<Run> {
        let mut guard = RunGuard::new(self.store.clone(), self.observer.clone());
        self.store.put_run(&guard.run).await?;
        info!("Run {} created with {} step(s)", guard.run.id, steps.len());

        let mut configs = Vec::with_capacity(steps.len());
        for reference in steps {
            match resolve(self.store.as_ref(), reference).await {
                Ok(config) => configs.push(config),
                Err(e @ EngineError::StoreFailure(_)) => return Err(e),
                Err(e) => return self.fail(guard, e).await,
            }
        }
        if let Err(e) = check_order(&configs) {
            return self.fail(guard, e).await;
        }

        let mut current = input.payload.clone();

        for (index, config) in configs.into_iter().enumerate() {
            guard.run.start_step(index);
            self.store.put_run(&guard.run).await?;

            let kind = step_kind(config.kind());
            let started_at = Utc::now();
            let clock = Instant::now();
            let digest = input_digest(&current);

            let outcome = self.execute_step(&config, &current, &input).await;
            let outcome = match outcome {
                Ok((data, used, retries)) => commit(self.store.as_ref(), &config, used)
                    .await
                    .map(|revision| (data, revision, retries)),
                Err(e) => Err(e),
            };

            let mut record = StepRecord {
                kind,
                config_id: config.id().to_string(),
                revision: config.revision(),
                status: StepStatus::Success,
                started_at,
                duration_ms: clock.elapsed().as_millis() as u64,
                retries: 0,
                input_digest: digest,
                error: None,
            };

            match outcome {
                Ok((data, revision, retries)) => {
                    record.revision = revision;
                    record.retries = retries;
                    guard.run.push_step(record);
                    info!("Run {}: step {} ({}) succeeded", guard.run.id, index, kind);
                    current = data;
                }
                Err(e @ EngineError::StoreFailure(_)) => return Err(e),
                Err(e) => {
                    if let EngineError::GenerationExhausted { attempts, .. } = &e {
                        record.retries = *attempts;
                    }
                    record.status = StepStatus::Failed;
                    record.error = Some(e.to_step_error());
                    guard.run.push_step(record);
                    return self.fail(guard, e).await;
                }
            }
        }

        guard.run.finish_success(current);
        self.finalize(guard).await
    }

    async fn execute_step(
        &self,
        config: &Config,
        current: &Value,
        input: &CallInput,
    ) -> Result<(Value, Config, u32)> {
        match config.clone() {
            Config::Api(api) => {
                let call_input = CallInput {
                    payload: current.clone(),
                    credentials: input.credentials.clone(),
                };
                let result = self.executor.execute_call(api, &call_input).await?;
                Ok((result.data, Config::Api(result.config), result.retries))
            }
            Config::Extract(extract) => {
                let result = self.executor.execute_extract(extract, current).await?;
                Ok((result.data, Config::Extract(result.config), result.retries))
            }
            Config::Transform(transform) => {
                let result = self.executor.execute_transform(transform, current).await?;
                Ok((result.data, Config::Transform(result.config), result.retries))
            }
        }
    }

    async fn fail(&self, mut guard: RunGuard, err: EngineError) -> Result<Run> {
        error!("Run {} failed: {}", guard.run.id, err);
        guard.run.finish_failed(err.to_string());
        self.finalize(guard).await
    }

    async fn finalize(&self, guard: RunGuard) -> Result<Run> {
        let run = guard.release();
        self.store.put_run(&run).await?;
        info!("Run {} finished with status {}", run.id, run.status);
        self.observer.on_run_finished(&run);
        Ok(run)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::testing::{ScriptedOracle, engine, reply};
    use serde_json::json;
    use splice_core::domain::config::{ConfigMeta, ExtractConfig, ExtractSource, TransformConfig};
    use splice_core::domain::run::{ErrorKind, RunStatus};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<RunStatus>>);

    impl RunObserver for Recorder {
        fn on_run_finished(&self, run: &Run) {
            self.0.lock().unwrap().push(run.status);
        }
    }

    fn extract(id: &str, selector: &str) -> Config {
        Config::Extract(ExtractConfig {
            meta: ConfigMeta::new(id, "pull the reading"),
            source: ExtractSource::Input,
            selector: selector.to_string(),
            schema: json!({"type": "object", "required": ["temp_f"]}),
        })
    }

    fn transform(id: &str, expression: &str) -> Config {
        Config::Transform(TransformConfig {
            meta: ConfigMeta::new(id, "convert"),
            expression: expression.to_string(),
            schema: json!({"type": "object", "required": ["tempC"]}),
        })
    }

    fn pipeline(oracle: Arc<ScriptedOracle>, store: Arc<MemoryStore>) -> Pipeline {
        Pipeline::new(Arc::new(engine(oracle, 1)), store)
    }

    #[tokio::test]
    async fn test_successful_run_records_every_step() {
        let store = Arc::new(MemoryStore::new());
        let recorder = Arc::new(Recorder::default());
        let pipeline = pipeline(ScriptedOracle::new(vec![]), store.clone())
            .with_observer(recorder.clone());

        let run = pipeline
            .run(
                vec![
                    extract("e", "$.current").into(),
                    transform("t", "{ tempC = input.temp_f }").into(),
                ],
                CallInput::from_payload(json!({"current": {"temp_f": 20}})),
            )
            .await
            .unwrap();

        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.output, Some(json!({"tempC": 20})));
        assert_eq!(run.steps.len(), 2);
        assert_eq!(run.steps[0].kind, StepKind::Extract);
        assert_eq!(
            run.steps[0].input_digest,
            input_digest(&json!({"current": {"temp_f": 20}}))
        );
        assert!(run.completed_at.is_some());

        let stored = store.get_run(run.id).await.unwrap().unwrap();
        assert_eq!(stored, run);
        assert_eq!(*recorder.0.lock().unwrap(), vec![RunStatus::Success]);
    }

    #[tokio::test]
    async fn test_missing_config_fails_the_run() {
        let store = Arc::new(MemoryStore::new());
        let run = pipeline(ScriptedOracle::new(vec![]), store)
            .run(vec![ConfigRef::Stored("ghost".into())], CallInput::default())
            .await
            .unwrap();

        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.error.unwrap().contains("ghost"));
    }

    #[tokio::test]
    async fn test_out_of_order_steps_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let run = pipeline(ScriptedOracle::new(vec![]), store)
            .run(
                vec![transform("t", "input").into(), extract("e", "$").into()],
                CallInput::default(),
            )
            .await
            .unwrap();

        assert_eq!(run.status, RunStatus::Failed);
        assert!(run.steps.is_empty());
        assert!(run.error.unwrap().contains("Invalid pipeline"));
    }

    #[tokio::test]
    async fn test_repair_creates_new_revision() {
        let store = Arc::new(MemoryStore::new());
        store.put_config(transform("t", "{ tempC = input.nope.x }")).await.unwrap();

        let oracle = ScriptedOracle::new(vec![reply(json!({"expression": "{ tempC = input.temp_f }"}))]);
        let run = pipeline(oracle, store.clone())
            .run(
                vec![ConfigRef::Stored("t".into())],
                CallInput::from_payload(json!({"temp_f": 3})),
            )
            .await
            .unwrap();

        assert_eq!(run.status, RunStatus::Success);
        assert_eq!(run.steps[0].revision, 2);
        assert_eq!(run.steps[0].retries, 1);

        let revisions = store.revisions("t").await;
        assert_eq!(revisions.len(), 2);
        assert!(matches!(&revisions[0], Config::Transform(t) if t.expression == "{ tempC = input.nope.x }"));
    }

    #[tokio::test]
    async fn test_exhausted_step_records_error_detail() {
        let store = Arc::new(MemoryStore::new());
        let oracle = ScriptedOracle::new(vec![
            reply(json!({"expression": "{ wrong = 1 }"})),
            reply(json!({"expression": "{ wrong = 2 }"})),
        ]);
        let run = pipeline(oracle, store)
            .run(
                vec![transform("t", "{ wrong = 0 }").into()],
                CallInput::from_payload(json!({})),
            )
            .await
            .unwrap();

        assert_eq!(run.status, RunStatus::Failed);
        let error = run.steps[0].error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::GenerationExhausted);
        assert_eq!(error.path.as_deref(), Some("/tempC"));
        assert_eq!(run.steps[0].retries, 2);
    }

    #[test]
    fn test_digest_is_stable() {
        let a = input_digest(&json!({"b": 1, "a": 2}));
        let b = input_digest(&json!({"a": 2, "b": 1}));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }
}
