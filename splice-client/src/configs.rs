//! Config-related API endpoints

use crate::SpliceClient;
use crate::error::Result;
use splice_core::domain::config::{Config, ConfigKind};
use splice_core::dto::config::{ConfigSummary, UpsertedConfig};

impl SpliceClient {
    // =============================================================================
    // Config Management
    // =============================================================================

    /// Store a config as a new revision of its id
    ///
    /// # Returns
    /// The id and the revision that was assigned
    pub async fn upsert_config(&self, config: &Config) -> Result<UpsertedConfig> {
        let url = format!("{}/api/configs", self.base_url);
        let response = self.client.put(&url).json(config).send().await?;

        self.handle_response(response).await
    }

    /// List the latest revision of every config, optionally of one kind
    pub async fn list_configs(&self, kind: Option<ConfigKind>) -> Result<Vec<ConfigSummary>> {
        let url = format!("{}/api/configs", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(kind) = kind {
            request = request.query(&[("kind", kind.as_str())]);
        }
        let response = request.send().await?;

        self.handle_response(response).await
    }

    /// Get the latest revision of a config
    pub async fn get_config(&self, id: &str) -> Result<Config> {
        let url = format!("{}/api/configs/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Delete a config and all of its revisions
    pub async fn delete_config(&self, id: &str) -> Result<()> {
        let url = format!("{}/api/configs/{}", self.base_url, id);
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
