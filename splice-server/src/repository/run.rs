//! Run Repository
//!
//! Runs are upserted by id at every state transition. Once a run has a
//! `completed_at` its row is final and later upserts leave it untouched.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub struct RunUpsert<'a> {
    pub id: Uuid,
    pub status: &'a str,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub body: serde_json::Value,
}

pub async fn upsert(pool: &PgPool, run: RunUpsert<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO runs (id, status, started_at, completed_at, body)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (id) DO UPDATE
        SET status = EXCLUDED.status,
            completed_at = EXCLUDED.completed_at,
            body = EXCLUDED.body
        WHERE runs.completed_at IS NULL
        "#,
    )
    .bind(run.id)
    .bind(run.status)
    .bind(run.started_at)
    .bind(run.completed_at)
    .bind(run.body)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<RunRow>, sqlx::Error> {
    sqlx::query_as::<_, RunRow>("SELECT id, body FROM runs WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// All runs, most recent first
pub async fn list_all(pool: &PgPool) -> Result<Vec<RunRow>, sqlx::Error> {
    sqlx::query_as::<_, RunRow>("SELECT id, body FROM runs ORDER BY started_at DESC")
        .fetch_all(pool)
        .await
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
pub struct RunRow {
    pub id: Uuid,
    pub body: serde_json::Value,
}
