//! Engine configuration
//!
//! Oracle connection, retry budget and per-operation time bounds.

use std::time::Duration;

use crate::repair::{RetryPolicy, TemperatureRamp};

/// Engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// API key for the OpenAI-compatible oracle
    pub api_key: String,

    /// Base URL of the oracle (e.g., "https://api.openai.com/v1")
    pub api_base_url: String,

    /// Model used for config repair and generation
    pub model: String,

    /// Model used by schema generation
    pub schema_model: String,

    /// Additional generation attempts after the first
    pub max_retries: u32,

    /// Temperature added per retry
    pub temperature_step: f32,

    /// Upper bound for the temperature ramp
    pub temperature_cap: f32,

    /// Time bound for each oracle call
    pub oracle_timeout: Duration,

    /// Time bound for each outbound API call
    pub http_timeout: Duration,

    /// Time bound for a single mapping expression evaluation
    pub expression_timeout: Duration,

    /// Hard stop for paginated calls
    pub max_pages: u32,
}

impl EngineConfig {
    /// Creates a configuration with defaults
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            schema_model: "gpt-4o".to_string(),
            max_retries: 3,
            temperature_step: 0.3,
            temperature_cap: 1.0,
            oracle_timeout: Duration::from_secs(60),
            http_timeout: Duration::from_secs(30),
            expression_timeout: Duration::from_secs(5),
            max_pages: 100,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - OPENAI_API_KEY (required)
    /// - OPENAI_API_BASE_URL (optional, default: https://api.openai.com/v1)
    /// - LLM_MODEL (optional, default: gpt-4o)
    /// - SCHEMA_GENERATION_MODEL (optional, default: LLM_MODEL)
    /// - MAX_RETRIES (optional, default: 3)
    /// - TEMPERATURE_STEP / TEMPERATURE_CAP (optional, default: 0.3 / 1.0)
    /// - ORACLE_TIMEOUT, HTTP_TIMEOUT, EXPRESSION_TIMEOUT (optional, seconds)
    /// - MAX_PAGES (optional, default: 100)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let api_key = lookup("OPENAI_API_KEY")
            .ok_or_else(|| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;

        let defaults = Self::new(api_key);

        let seconds = |name: &str, default: Duration| {
            lookup(name)
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        let model = lookup("LLM_MODEL").unwrap_or(defaults.model.clone());

        Ok(Self {
            api_base_url: lookup("OPENAI_API_BASE_URL").unwrap_or(defaults.api_base_url.clone()),
            schema_model: lookup("SCHEMA_GENERATION_MODEL").unwrap_or(model.clone()),
            model,
            max_retries: lookup("MAX_RETRIES")
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(defaults.max_retries),
            temperature_step: lookup("TEMPERATURE_STEP")
                .and_then(|s| s.parse::<f32>().ok())
                .unwrap_or(defaults.temperature_step),
            temperature_cap: lookup("TEMPERATURE_CAP")
                .and_then(|s| s.parse::<f32>().ok())
                .unwrap_or(defaults.temperature_cap),
            oracle_timeout: seconds("ORACLE_TIMEOUT", defaults.oracle_timeout),
            http_timeout: seconds("HTTP_TIMEOUT", defaults.http_timeout),
            expression_timeout: seconds("EXPRESSION_TIMEOUT", defaults.expression_timeout),
            max_pages: lookup("MAX_PAGES")
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(defaults.max_pages),
            ..defaults
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
        }
    }

    pub fn temperature_ramp(&self) -> TemperatureRamp {
        TemperatureRamp {
            step: self.temperature_step,
            cap: self.temperature_cap,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.is_empty() {
            anyhow::bail!("api_key cannot be empty");
        }

        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://") {
            anyhow::bail!("api_base_url must start with http:// or https://");
        }

        if self.model.is_empty() || self.schema_model.is_empty() {
            anyhow::bail!("model names cannot be empty");
        }

        if self.temperature_step < 0.0 || self.temperature_cap < 0.0 || self.temperature_cap > 2.0 {
            anyhow::bail!("temperature step and cap must lie within 0.0..=2.0");
        }

        if self.oracle_timeout.is_zero()
            || self.http_timeout.is_zero()
            || self.expression_timeout.is_zero()
        {
            anyhow::bail!("timeouts must be greater than 0");
        }

        if self.max_pages == 0 {
            anyhow::bail!("max_pages must be greater than 0");
        }

        Ok(())
    }
}
