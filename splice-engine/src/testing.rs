//! Test doubles shared by the unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::executor::Engine;
use crate::http::ReqwestHttpClient;
use crate::oracle::{CompletionOptions, Message, Oracle, OracleError};

/// Replays scripted replies and records every request
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String, OracleError>>>,
    requests: Mutex<Vec<(Vec<Message>, Option<f32>)>>,
    temperature: bool,
}

impl ScriptedOracle {
    pub fn new(replies: Vec<Result<String, OracleError>>) -> Arc<Self> {
        Arc::new(Self::unshared(replies))
    }

    /// Oracle whose backend ignores sampling temperature
    pub fn fixed_sampling(replies: Vec<Result<String, OracleError>>) -> Arc<Self> {
        Arc::new(Self {
            temperature: false,
            ..Self::unshared(replies)
        })
    }

    fn unshared(replies: Vec<Result<String, OracleError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            temperature: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn temperatures(&self) -> Vec<Option<f32>> {
        self.requests.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }

    /// Messages sent on the `n`th call
    pub fn messages(&self, n: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[n].0.clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, OracleError> {
        self.requests
            .lock()
            .unwrap()
            .push((messages.to_vec(), options.temperature));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(OracleError::EmptyResponse))
    }

    fn supports_temperature(&self, _model: &str) -> bool {
        self.temperature
    }
}

pub fn reply(artifact: Value) -> Result<String, OracleError> {
    Ok(artifact.to_string())
}

pub fn engine(oracle: Arc<ScriptedOracle>, max_retries: u32) -> Engine {
    engine_with(oracle, max_retries, |_| {})
}

/// Test engine with extra config tweaks applied before construction
pub fn engine_with(
    oracle: Arc<ScriptedOracle>,
    max_retries: u32,
    tweak: impl FnOnce(&mut EngineConfig),
) -> Engine {
    let mut config = EngineConfig::new("sk-test");
    config.max_retries = max_retries;
    config.max_pages = 10;
    tweak(&mut config);
    let http = ReqwestHttpClient::new(config.http_timeout).unwrap();
    Engine::new(oracle, Arc::new(http), &config)
}
