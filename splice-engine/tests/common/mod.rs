#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use splice_core::domain::config::{ApiConfig, ExtractConfig, TransformConfig};
use splice_core::dto::execute::{CallInput, CallResult, ExtractResult, TransformResult};
use splice_engine::http::ReqwestHttpClient;
use splice_engine::{
    CompletionOptions, ConfigExecutor, Engine, EngineConfig, Message, Oracle, OracleError,
};
use tokio::sync::Mutex;

/// Oracle that replays canned answers in order
pub struct StubOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    calls: AtomicUsize,
}

impl StubOracle {
    pub fn new(replies: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|v| Ok(v.to_string())).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Oracle for StubOracle {
    async fn complete(
        &self,
        _messages: &[Message],
        _options: &CompletionOptions,
    ) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .await
            .pop_front()
            .unwrap_or(Err(OracleError::EmptyResponse))
    }

    fn supports_temperature(&self, model: &str) -> bool {
        model.starts_with("gpt-4")
    }
}

pub fn engine(oracle: Arc<StubOracle>, max_retries: u32) -> Engine {
    let mut config = EngineConfig::new("sk-test");
    config.max_retries = max_retries;
    let http = ReqwestHttpClient::new(config.http_timeout).expect("http client");
    Engine::new(oracle, Arc::new(http), &config)
}

/// Counts executor invocations per kind
pub struct CountingExecutor {
    inner: Engine,
    pub calls: AtomicUsize,
    pub extracts: AtomicUsize,
    pub transforms: AtomicUsize,
}

impl CountingExecutor {
    pub fn new(inner: Engine) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
            extracts: AtomicUsize::new(0),
            transforms: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ConfigExecutor for CountingExecutor {
    async fn execute_call(
        &self,
        config: ApiConfig,
        input: &CallInput,
    ) -> splice_engine::Result<CallResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.execute_call(config, input).await
    }

    async fn execute_extract(
        &self,
        config: ExtractConfig,
        input: &Value,
    ) -> splice_engine::Result<ExtractResult> {
        self.extracts.fetch_add(1, Ordering::SeqCst);
        self.inner.execute_extract(config, input).await
    }

    async fn execute_transform(
        &self,
        config: TransformConfig,
        input: &Value,
    ) -> splice_engine::Result<TransformResult> {
        self.transforms.fetch_add(1, Ordering::SeqCst);
        self.inner.execute_transform(config, input).await
    }
}
