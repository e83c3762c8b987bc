//! Config repair loop
//!
//! Drives a generation task against the oracle until the produced artifact is
//! accepted or the retry budget is spent. Every attempt builds a fresh
//! [`Conversation`] value from the previous one, so concurrent loops share
//! nothing beyond the oracle handle.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, Result};
use crate::oracle::{CompletionOptions, Message, Oracle, ResponseFormat};

/// One generation request
#[derive(Debug, Clone)]
pub struct GenerationTask {
    /// Short label used in logs, e.g. "transform weather-to-celsius"
    pub label: String,
    pub system: String,
    pub instruction: String,
    /// Data the artifact is generated for; `None` still yields a usable prompt
    pub subject: Option<Value>,
    pub model: String,
    pub response_format: ResponseFormat,
}

// ============================================================================
// Conversation
// ============================================================================

/// Message history for a single loop invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn start(task: &GenerationTask) -> Self {
        let data = match &task.subject {
            Some(Value::Null) | None => {
                "No sample data is available. Infer the most likely shape from the instruction."
                    .to_string()
            }
            Some(subject) => format!(
                "Data:\n{}",
                serde_json::to_string_pretty(subject).unwrap_or_else(|_| subject.to_string())
            ),
        };

        Self {
            messages: vec![
                Message::system(task.system.clone()),
                Message::user(format!("Instruction: {}\n\n{}", task.instruction, data)),
            ],
        }
    }

    /// Returns the conversation extended with a failed attempt
    pub fn with_failure(&self, output: Option<&str>, failure: &EngineError) -> Self {
        let mut messages = self.messages.clone();
        if let Some(output) = output {
            messages.push(Message::assistant(output));
        }
        messages.push(Message::user(format!(
            "The previous attempt failed with error: {}. Please correct it and answer again.",
            failure
        )));
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }
}

// ============================================================================
// Policies
// ============================================================================

/// Sampling temperature per attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureRamp {
    pub step: f32,
    pub cap: f32,
}

impl TemperatureRamp {
    /// Attempt 0 is deterministic; retry `n` uses `min(step * n, cap)`
    pub fn for_attempt(&self, attempt: u32) -> f32 {
        if attempt == 0 {
            0.0
        } else {
            (self.step * attempt as f32).min(self.cap).max(0.0)
        }
    }
}

impl Default for TemperatureRamp {
    fn default() -> Self {
        Self {
            step: 0.3,
            cap: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

// ============================================================================
// Artifact parsing
// ============================================================================

/// Outcome of reading oracle text as JSON
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedArtifact {
    Parsed(Value),
    Malformed(String),
}

pub fn parse_artifact(text: &str) -> ParsedArtifact {
    let trimmed = strip_code_fence(text.trim());

    match serde_json::from_str(trimmed) {
        Ok(value) => ParsedArtifact::Parsed(value),
        Err(e) => match find_json_in_text(trimmed) {
            Some(value) => ParsedArtifact::Parsed(value),
            None => ParsedArtifact::Malformed(format!("response is not valid JSON: {}", e)),
        },
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the language tag
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn find_json_in_text(text: &str) -> Option<Value> {
    [('{', '}'), ('[', ']')].into_iter().find_map(|(open, close)| {
        let start = text.find(open)?;
        balanced_json(&text[start..], open, close)
    })
}

/// Parses the balanced `open`..`close` span at the start of `text`
fn balanced_json(text: &str, open: char, close: char) -> Option<Value> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            c if c == open => depth += 1,
            c if c == close => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return serde_json::from_str(&text[..i + c.len_utf8()]).ok();
                }
            }
            _ => {}
        }
    }
    None
}

/// Reads a required string field from a generated artifact
pub fn artifact_str(artifact: &Value, field: &str) -> Result<String> {
    artifact
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            EngineError::MalformedOutput(format!("expected a JSON object with a string '{}'", field))
        })
}

// ============================================================================
// Loop
// ============================================================================

/// Accepted artifact plus the number of oracle calls it took
#[derive(Debug, Clone, PartialEq)]
pub struct Repaired<T> {
    pub artifact: T,
    pub attempts: u32,
}

#[derive(Clone)]
pub struct RepairLoop {
    oracle: Arc<dyn Oracle>,
    policy: RetryPolicy,
    ramp: TemperatureRamp,
    timeout: Duration,
}

impl RepairLoop {
    pub fn new(oracle: Arc<dyn Oracle>, policy: RetryPolicy, ramp: TemperatureRamp) -> Self {
        Self {
            oracle,
            policy,
            ramp,
            timeout: Duration::from_secs(60),
        }
    }

    /// Per oracle call time bound
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    fn options(&self, task: &GenerationTask, attempt: u32) -> CompletionOptions {
        let temperature = self
            .oracle
            .supports_temperature(&task.model)
            .then(|| self.ramp.for_attempt(attempt));

        CompletionOptions {
            model: task.model.clone(),
            temperature,
            response_format: task.response_format.clone(),
        }
    }

    /// Repairs starting from a known failure of the current artifact
    pub async fn repair<T, F, Fut>(
        &self,
        task: &GenerationTask,
        failure: &EngineError,
        accept: F,
    ) -> Result<Repaired<T>>
    where
        F: FnMut(Value) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let conversation = Conversation::start(task).with_failure(None, failure);
        self.fold(task, conversation, accept).await
    }

    /// Generates an artifact from scratch
    pub async fn generate<T, F, Fut>(&self, task: &GenerationTask, accept: F) -> Result<Repaired<T>>
    where
        F: FnMut(Value) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.fold(task, Conversation::start(task), accept).await
    }

    async fn fold<T, F, Fut>(
        &self,
        task: &GenerationTask,
        initial: Conversation,
        mut accept: F,
    ) -> Result<Repaired<T>>
    where
        F: FnMut(Value) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.policy.max_retries + 1;
        let mut conversation = initial;
        let mut last = None;

        for attempt in 0..attempts {
            let options = self.options(task, attempt);
            debug!(
                "{}: attempt {}/{} (temperature {:?})",
                task.label,
                attempt + 1,
                attempts,
                options.temperature
            );

            let (output, outcome) = self.attempt(&conversation, &options, &mut accept).await;

            let failure = match outcome {
                Ok(artifact) => {
                    if attempt > 0 {
                        info!("{}: repaired after {} retries", task.label, attempt);
                    }
                    return Ok(Repaired {
                        artifact,
                        attempts: attempt + 1,
                    });
                }
                Err(e) if e.is_repairable() => e,
                Err(e) => return Err(e),
            };

            warn!("{}: attempt {} failed: {}", task.label, attempt + 1, failure);
            conversation = conversation.with_failure(output.as_deref(), &failure);
            last = Some(failure);
        }

        let last = last.unwrap_or_else(|| EngineError::OracleFailure("no attempts made".into()));
        error!("{}: generation exhausted after {} attempts", task.label, attempts);
        Err(EngineError::GenerationExhausted {
            attempts,
            last: Box::new(last),
        })
    }

    /// Runs one oracle round trip; returns the raw output alongside the outcome
    async fn attempt<T, F, Fut>(
        &self,
        conversation: &Conversation,
        options: &CompletionOptions,
        accept: &mut F,
    ) -> (Option<String>, Result<T>)
    where
        F: FnMut(Value) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let completion =
            tokio::time::timeout(self.timeout, self.oracle.complete(conversation.messages(), options))
                .await;

        let text = match completion {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => return (None, Err(EngineError::OracleFailure(e.to_string()))),
            Err(_) => {
                return (
                    None,
                    Err(EngineError::OracleFailure(format!(
                        "oracle call timed out after {:?}",
                        self.timeout
                    ))),
                );
            }
        };

        let outcome = match parse_artifact(&text) {
            ParsedArtifact::Parsed(value) => accept(value).await,
            ParsedArtifact::Malformed(reason) => Err(EngineError::MalformedOutput(reason)),
        };
        (Some(text), outcome)
    }
}
