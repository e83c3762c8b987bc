use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{CompletionOptions, Message, Oracle, OracleError, ResponseFormat};

/// Model prefixes that accept a temperature
const DEFAULT_TEMPERATURE_MODELS: &[&str] = &["gpt-4"];

/// Oracle backed by an OpenAI-compatible chat completions endpoint
#[derive(Debug, Clone)]
pub struct OpenAiOracle {
    base_url: String,
    api_key: String,
    client: Client,
    temperature_models: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiOracle {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OracleError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
            temperature_models: DEFAULT_TEMPERATURE_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        })
    }

    /// Replace the list of model prefixes that receive a temperature
    pub fn with_temperature_models(mut self, models: Vec<String>) -> Self {
        self.temperature_models = models;
        self
    }

    fn request_body(&self, messages: &[Message], options: &CompletionOptions) -> Value {
        let mut body = json!({
            "model": options.model,
            "messages": messages,
        });

        if let Some(temperature) = options.temperature {
            body["temperature"] = json!(temperature);
        }

        match &options.response_format {
            ResponseFormat::Text => {}
            ResponseFormat::JsonObject => {
                body["response_format"] = json!({ "type": "json_object" });
            }
            ResponseFormat::JsonSchema { name, schema } => {
                body["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": { "name": name, "schema": schema }
                });
            }
        }

        body
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn complete(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<String, OracleError> {
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(messages, options))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout
                } else {
                    OracleError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => OracleError::Quota(message),
                _ => OracleError::Status {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let completion: ChatCompletion = response.json().await.map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout
            } else {
                OracleError::Network(format!("invalid completion payload: {}", e))
            }
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(OracleError::EmptyResponse)
    }

    fn supports_temperature(&self, model: &str) -> bool {
        self.temperature_models
            .iter()
            .any(|prefix| model.starts_with(prefix.as_str()))
    }
}
