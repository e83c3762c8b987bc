//! Generation oracle
//!
//! The oracle is an LLM completion endpoint: it receives an ordered message
//! list and returns untyped text that is expected to parse as JSON.

mod openai;

pub use openai::OpenAiOracle;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Output constraint passed to the oracle
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    Text,
    JsonObject,
    JsonSchema { name: String, schema: Value },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub model: String,
    /// `None` leaves sampling at the backend default
    pub temperature: Option<f32>,
    pub response_format: ResponseFormat,
}

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Network(String),

    #[error("oracle request timed out")]
    Timeout,

    #[error("oracle quota exceeded: {0}")]
    Quota(String),

    #[error("oracle returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("oracle returned no content")]
    EmptyResponse,
}

#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, OracleError>;

    /// Whether `model` accepts a sampling temperature
    fn supports_temperature(&self, model: &str) -> bool;
}
