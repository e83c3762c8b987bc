//! Configuration module
//!
//! Handles CLI configuration such as the server URL.

use std::time::Duration;

use anyhow::{Context, Result};
use splice_client::SpliceClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the splice server
    pub server_url: String,
    pub timeout_secs: u64,
}

impl Config {
    /// Build a client honoring the configured timeout
    pub fn client(&self) -> Result<SpliceClient> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(SpliceClient::with_client(&self.server_url, http))
    }
}
