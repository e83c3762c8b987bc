//! Config Repository
//!
//! Config revisions are append-only rows keyed by (id, revision).

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

/// Serializes revision creation for one config id until the transaction ends
pub async fn lock_id(conn: &mut PgConnection, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Highest stored revision of a config
pub async fn latest_revision(conn: &mut PgConnection, id: &str) -> Result<Option<i32>, sqlx::Error> {
    sqlx::query_scalar::<_, Option<i32>>("SELECT MAX(revision) FROM configs WHERE id = $1")
        .bind(id)
        .fetch_one(conn)
        .await
}

pub struct NewRevision<'a> {
    pub id: &'a str,
    pub revision: i32,
    pub kind: &'a str,
    pub instruction: &'a str,
    pub body: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub async fn insert(conn: &mut PgConnection, row: NewRevision<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO configs (id, revision, kind, instruction, body, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(row.id)
    .bind(row.revision)
    .bind(row.kind)
    .bind(row.instruction)
    .bind(row.body)
    .bind(row.created_at)
    .bind(row.updated_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Latest revision of a config
pub async fn find_latest(pool: &PgPool, id: &str) -> Result<Option<ConfigRow>, sqlx::Error> {
    sqlx::query_as::<_, ConfigRow>(
        r#"
        SELECT id, revision, kind, body
        FROM configs
        WHERE id = $1
        ORDER BY revision DESC
        LIMIT 1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Latest revision of every config, optionally of one kind
pub async fn list_latest(pool: &PgPool, kind: Option<&str>) -> Result<Vec<ConfigRow>, sqlx::Error> {
    sqlx::query_as::<_, ConfigRow>(
        r#"
        SELECT DISTINCT ON (id) id, revision, kind, body
        FROM configs
        WHERE $1::VARCHAR IS NULL OR kind = $1
        ORDER BY id, revision DESC
        "#,
    )
    .bind(kind)
    .fetch_all(pool)
    .await
}

/// Delete every revision of a config
pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM configs WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
pub struct ConfigRow {
    pub id: String,
    pub revision: i32,
    pub kind: String,
    pub body: serde_json::Value,
}
