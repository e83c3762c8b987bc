//! Postgres-backed store accessor

use async_trait::async_trait;
use splice_core::domain::config::{Config, ConfigKind};
use splice_core::domain::run::Run;
use splice_engine::store::{Store, StoreError, stamp_revision};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::{config as config_repo, run as run_repo};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    tracing::error!("Database error: {:?}", err);
    StoreError::Unavailable(err.to_string())
}

fn corrupt(what: impl std::fmt::Display, err: serde_json::Error) -> StoreError {
    StoreError::Corrupt(format!("{}: {}", what, err))
}

fn decode_config(row: config_repo::ConfigRow) -> Result<Config, StoreError> {
    let mut config: Config = serde_json::from_value(row.body)
        .map_err(|e| corrupt(format_args!("config {} revision {}", row.id, row.revision), e))?;
    // Row columns are authoritative
    config.meta_mut().revision = row.revision as u32;
    if config.kind().as_str() != row.kind {
        return Err(StoreError::Corrupt(format!(
            "config {} has kind column {} but body of kind {}",
            row.id,
            row.kind,
            config.kind()
        )));
    }
    Ok(config)
}

fn decode_run(row: run_repo::RunRow) -> Result<Run, StoreError> {
    serde_json::from_value(row.body).map_err(|e| corrupt(format_args!("run {}", row.id), e))
}

#[async_trait]
impl Store for PgStore {
    async fn get_config(&self, id: &str) -> Result<Option<Config>, StoreError> {
        config_repo::find_latest(&self.pool, id)
            .await
            .map_err(unavailable)?
            .map(decode_config)
            .transpose()
    }

    async fn put_config(&self, config: Config) -> Result<u32, StoreError> {
        let mut tx = self.pool.begin().await.map_err(unavailable)?;

        config_repo::lock_id(&mut tx, config.id())
            .await
            .map_err(unavailable)?;
        let latest = config_repo::latest_revision(&mut tx, config.id())
            .await
            .map_err(unavailable)?;

        let config = stamp_revision(config, latest.map(|r| r as u32));
        let body = serde_json::to_value(&config).map_err(|e| corrupt(config.id(), e))?;
        let meta = config.meta();

        config_repo::insert(
            &mut tx,
            config_repo::NewRevision {
                id: &meta.id,
                revision: meta.revision as i32,
                kind: config.kind().as_str(),
                instruction: &meta.instruction,
                body,
                created_at: meta.created_at,
                updated_at: meta.updated_at,
            },
        )
        .await
        .map_err(unavailable)?;

        tx.commit().await.map_err(unavailable)?;

        tracing::debug!("Stored config {} revision {}", meta.id, meta.revision);
        Ok(meta.revision)
    }

    async fn delete_config(&self, id: &str) -> Result<bool, StoreError> {
        config_repo::delete(&self.pool, id).await.map_err(unavailable)
    }

    async fn list_configs(&self, kind: Option<ConfigKind>) -> Result<Vec<Config>, StoreError> {
        config_repo::list_latest(&self.pool, kind.as_ref().map(ConfigKind::as_str))
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(decode_config)
            .collect()
    }

    async fn put_run(&self, run: &Run) -> Result<(), StoreError> {
        let body = serde_json::to_value(run).map_err(|e| corrupt(run.id, e))?;
        run_repo::upsert(
            &self.pool,
            run_repo::RunUpsert {
                id: run.id,
                status: run.status.as_str(),
                started_at: run.started_at,
                completed_at: run.completed_at,
                body,
            },
        )
        .await
        .map_err(unavailable)
    }

    async fn get_run(&self, id: Uuid) -> Result<Option<Run>, StoreError> {
        run_repo::find_by_id(&self.pool, id)
            .await
            .map_err(unavailable)?
            .map(decode_run)
            .transpose()
    }

    async fn list_runs(&self) -> Result<Vec<Run>, StoreError> {
        run_repo::list_all(&self.pool)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(decode_run)
            .collect()
    }
}
