//! # pagemeta-db
//!
//! Storage layer for pagemeta.
//!
//! This crate provides:
//! - Connection pool management
//! - Idempotent schema bootstrap
//! - PostgreSQL repositories for metadata records and the job queue
//! - In-memory repositories with the same contracts
//! - Upload storage for batch files
//!
//! ## Example
//!
//! ```rust,ignore
//! use pagemeta_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/pagemeta").await?;
//!     db.ensure_schema().await?;
//!
//!     let job_id = db.jobs.queue("/tmp/pagemeta/urls.csv").await?;
//!     println!("Queued job: {}", job_id);
//!     Ok(())
//! }
//! ```
pub mod file_storage;
pub mod jobs;
pub mod memory;
pub mod pool;
pub mod records;
pub mod schema;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

use std::sync::Arc;

// Re-export core types
pub use pagemeta_core::*;

pub use file_storage::UploadStore;
pub use jobs::PgJobRepository;
pub use memory::{MemoryJobRepository, MemoryMetadataRepository};
pub use pool::{connect_pool, log_pool_usage, PoolConfig, PoolUsage};
pub use records::PgMetadataRepository;
pub use schema::ensure_schema;

/// URL scheme that selects the in-memory repositories.
pub const MEMORY_URL_SCHEME: &str = "memory://";

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool, absent for in-memory stores.
    pool: Option<sqlx::Pool<sqlx::Postgres>>,
    /// Job repository for background processing.
    pub jobs: Arc<dyn JobRepository>,
    /// Scraped metadata records.
    pub records: Arc<dyn MetadataRepository>,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            jobs: Arc::new(PgJobRepository::new(pool.clone())),
            records: Arc::new(PgMetadataRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a Database backed entirely by process memory.
    pub fn in_memory() -> Self {
        Self {
            pool: None,
            jobs: Arc::new(MemoryJobRepository::new()),
            records: Arc::new(MemoryMetadataRepository::new()),
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    ///
    /// `memory://` yields an in-memory store; anything else is handed to
    /// PostgreSQL.
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_config(url, PoolConfig::default()).await
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        if url.starts_with(MEMORY_URL_SCHEME) {
            tracing::warn!(
                subsystem = "db",
                component = "pool",
                "Using in-memory storage, data is lost on restart"
            );
            return Ok(Self::in_memory());
        }
        let pool = connect_pool(url, &config).await?;
        Ok(Self::new(pool))
    }

    /// Create the tables if needed. No-op for in-memory stores.
    pub async fn ensure_schema(&self) -> Result<()> {
        match &self.pool {
            Some(pool) => schema::ensure_schema(pool).await,
            None => Ok(()),
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> Option<&sqlx::Pool<sqlx::Postgres>> {
        self.pool.as_ref()
    }

    pub fn is_in_memory(&self) -> bool {
        self.pool.is_none()
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_url_selects_in_memory_store() {
        let db = Database::connect("memory://").await.unwrap();
        assert!(db.is_in_memory());
        assert!(db.pool().is_none());
        db.ensure_schema().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let db = Database::in_memory();
        let clone = db.clone();

        let job_id = db.jobs.queue("/tmp/a.csv").await.unwrap();
        assert!(clone.jobs.get(job_id).await.unwrap().is_some());
    }
}
