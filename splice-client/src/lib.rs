//! Splice HTTP Client
//!
//! A type-safe HTTP client for the splice server API, shared by the CLI
//! and by services that drive integrations remotely.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use splice_client::SpliceClient;
//! use splice_core::dto::config::ConfigRef;
//! use splice_core::dto::execute::CallInput;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = SpliceClient::new("http://localhost:8080");
//!
//!     let run = client
//!         .run_pipeline(
//!             vec![ConfigRef::Stored("weather-call".into())],
//!             CallInput::from_payload(json!({ "city": "Paris" })),
//!         )
//!         .await?;
//!
//!     println!("Run {} finished as {}", run.id, run.status.as_str());
//!     Ok(())
//! }
//! ```

pub mod error;
mod configs;
mod execute;
mod runs;

pub use error::{ClientError, Result};

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// HTTP client for the splice server API
///
/// Methods are grouped into config management, run history and execution.
#[derive(Debug, Clone)]
pub struct SpliceClient {
    /// Base URL of the server (e.g., "http://localhost:8080")
    base_url: String,
    client: Client,
}

impl SpliceClient {
    /// Create a new client
    ///
    /// # Example
    /// ```
    /// use splice_client::SpliceClient;
    ///
    /// let client = SpliceClient::new("http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new client with a custom HTTP client
    ///
    /// Execution endpoints may consult the oracle several times, so callers
    /// usually want a generous timeout here.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the server
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /health
    pub async fn health(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_empty_response(response).await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code, then deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            return Err(Self::error_from(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Handle an API response that returns no content (e.g., DELETE operations)
    async fn handle_empty_response(&self, response: reqwest::Response) -> Result<()> {
        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        Ok(())
    }

    /// Unwraps the server's `{"error": ...}` body when present
    async fn error_from(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(text);

        tracing::debug!("Server returned {}: {}", status, message);
        ClientError::api_error(status, message)
    }
}
