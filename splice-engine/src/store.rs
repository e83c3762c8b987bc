//! Store accessor
//!
//! Durable storage for config revisions and run records. The engine only
//! depends on the [`Store`] trait; [`MemoryStore`] backs tests and
//! single-process use.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use splice_core::domain::config::{Config, ConfigKind};
use splice_core::domain::run::Run;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::EngineError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("stored record is corrupt: {0}")]
    Corrupt(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        EngineError::StoreFailure(err.to_string())
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Latest revision of a config
    async fn get_config(&self, id: &str) -> Result<Option<Config>, StoreError>;

    /// Writes `config` as a new revision of its id and returns that revision
    ///
    /// Revision numbers are assigned by the store, atomically per id.
    async fn put_config(&self, config: Config) -> Result<u32, StoreError>;

    /// Removes every revision of a config; returns whether anything was removed
    async fn delete_config(&self, id: &str) -> Result<bool, StoreError>;

    /// Latest revision of every config, optionally restricted to one kind
    async fn list_configs(&self, kind: Option<ConfigKind>) -> Result<Vec<Config>, StoreError>;

    /// Inserts or replaces a run record. A stored run that already finished
    /// is never replaced, so a late in-flight snapshot cannot undo it.
    async fn put_run(&self, run: &Run) -> Result<(), StoreError>;

    async fn get_run(&self, id: Uuid) -> Result<Option<Run>, StoreError>;

    /// All runs, most recent first
    async fn list_runs(&self) -> Result<Vec<Run>, StoreError>;
}

/// Stamps `config` as the revision after `latest`
pub fn stamp_revision(mut config: Config, latest: Option<u32>) -> Config {
    let now = Utc::now();
    let meta = config.meta_mut();
    meta.revision = latest.map_or(1, |r| r + 1);
    meta.updated_at = now;
    if latest.is_none() {
        meta.created_at = now;
    }
    config
}

/// In-process store keeping every revision
#[derive(Debug, Default)]
pub struct MemoryStore {
    configs: RwLock<HashMap<String, Vec<Config>>>,
    runs: RwLock<HashMap<Uuid, Run>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored revision of a config, oldest first
    pub async fn revisions(&self, id: &str) -> Vec<Config> {
        self.configs
            .read()
            .await
            .get(id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_config(&self, id: &str) -> Result<Option<Config>, StoreError> {
        Ok(self
            .configs
            .read()
            .await
            .get(id)
            .and_then(|revisions| revisions.last().cloned()))
    }

    async fn put_config(&self, config: Config) -> Result<u32, StoreError> {
        let mut configs = self.configs.write().await;
        let revisions = configs.entry(config.id().to_string()).or_default();

        let config = stamp_revision(config, revisions.last().map(Config::revision));
        let revision = config.revision();
        revisions.push(config);
        Ok(revision)
    }

    async fn delete_config(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.configs.write().await.remove(id).is_some())
    }

    async fn list_configs(&self, kind: Option<ConfigKind>) -> Result<Vec<Config>, StoreError> {
        let configs = self.configs.read().await;
        let mut latest: Vec<Config> = configs
            .values()
            .filter_map(|revisions| revisions.last().cloned())
            .filter(|config| kind.is_none_or(|k| config.kind() == k))
            .collect();
        latest.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(latest)
    }

    async fn put_run(&self, run: &Run) -> Result<(), StoreError> {
        let mut runs = self.runs.write().await;
        if runs.get(&run.id).is_some_and(Run::is_finished) {
            debug!("Run {} already finished; ignoring {} snapshot", run.id, run.status);
            return Ok(());
        }
        runs.insert(run.id, run.clone());
        Ok(())
    }

    async fn get_run(&self, id: Uuid) -> Result<Option<Run>, StoreError> {
        Ok(self.runs.read().await.get(&id).cloned())
    }

    async fn list_runs(&self) -> Result<Vec<Run>, StoreError> {
        let mut runs: Vec<Run> = self.runs.read().await.values().cloned().collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }
}
