//! Idempotent table bootstrap.
//!
//! The schema is small and fixed, so it is created with `IF NOT EXISTS`
//! statements at startup rather than through versioned migrations.

use sqlx::{Pool, Postgres};
use tracing::info;

use pagemeta_core::{Error, Result};

/// Statements run in order by [`ensure_schema`].
pub const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS metadata (
        id BIGSERIAL PRIMARY KEY,
        url TEXT NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        description TEXT NOT NULL DEFAULT '',
        keywords TEXT NOT NULL DEFAULT '',
        processed BOOLEAN NOT NULL DEFAULT FALSE
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_metadata_url ON metadata (url)",
    "CREATE TABLE IF NOT EXISTS job_queue (
        id UUID PRIMARY KEY,
        batch_path TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending'
            CHECK (status IN ('pending', 'running', 'succeeded', 'failed')),
        result JSONB,
        error_message TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        started_at TIMESTAMPTZ,
        completed_at TIMESTAMPTZ
    )",
    "CREATE INDEX IF NOT EXISTS idx_job_queue_pending
        ON job_queue (created_at) WHERE status = 'pending'",
    "CREATE INDEX IF NOT EXISTS idx_job_queue_completed_at
        ON job_queue (completed_at) WHERE completed_at IS NOT NULL",
];

/// Create the `metadata` and `job_queue` tables if they do not exist.
pub async fn ensure_schema(pool: &Pool<Postgres>) -> Result<()> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(Error::Database)?;
    }
    info!(
        subsystem = "db",
        component = "schema",
        op = "ensure",
        statements = SCHEMA_STATEMENTS.len(),
        "Database schema ready"
    );
    Ok(())
}
