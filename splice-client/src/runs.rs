//! Run history endpoints

use crate::SpliceClient;
use crate::error::Result;
use splice_core::domain::run::Run;
use uuid::Uuid;

impl SpliceClient {
    /// List recorded runs, newest first
    pub async fn list_runs(&self) -> Result<Vec<Run>> {
        let url = format!("{}/api/runs", self.base_url);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    pub async fn get_run(&self, run_id: Uuid) -> Result<Run> {
        let url = format!("{}/api/runs/{}", self.base_url, run_id);
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
