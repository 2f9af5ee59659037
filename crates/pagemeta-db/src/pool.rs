//! PostgreSQL connection pool.
//!
//! Connections are shared by the API (status and result lookups, job
//! submission) and by the worker (claims, status transitions, and one
//! insert transaction per finished batch).

use std::time::{Duration, Instant};

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{debug, info, warn};

use pagemeta_core::{defaults, Error, Result};

/// Pool sizing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Upper bound on open connections.
    pub max_connections: u32,
    /// How long a caller waits for a free connection before erroring.
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: defaults::DB_MAX_CONNECTIONS,
            acquire_timeout: Duration::from_secs(defaults::DB_ACQUIRE_TIMEOUT_SECS),
        }
    }
}

/// Open a pool against `database_url`.
pub async fn connect_pool(database_url: &str, config: &PoolConfig) -> Result<PgPool> {
    let start = Instant::now();

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await
        .map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "pool",
        op = "connect",
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout.as_secs(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Connected to PostgreSQL"
    );
    Ok(pool)
}

/// Snapshot of connection usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolUsage {
    pub open: u32,
    pub idle: usize,
    pub max: u32,
}

impl PoolUsage {
    pub fn of(pool: &PgPool) -> Self {
        Self {
            open: pool.size(),
            idle: pool.num_idle(),
            max: pool.options().get_max_connections(),
        }
    }

    pub fn in_use(&self) -> u32 {
        self.open
            .saturating_sub(u32::try_from(self.idle).unwrap_or(u32::MAX))
    }

    /// Every connection the pool may open is checked out.
    pub fn saturated(&self) -> bool {
        self.max > 0 && self.in_use() >= self.max
    }
}

/// Log connection usage; warns when the pool is saturated, since status
/// lookups then wait behind running batches.
pub fn log_pool_usage(pool: &PgPool) {
    let usage = PoolUsage::of(pool);

    if usage.saturated() {
        warn!(
            subsystem = "db",
            component = "pool",
            op = "usage",
            in_use = usage.in_use(),
            max_connections = usage.max,
            "All database connections in use"
        );
    } else {
        debug!(
            subsystem = "db",
            component = "pool",
            op = "usage",
            open = usage.open,
            idle = usage.idle,
            max_connections = usage.max,
            "Database pool usage"
        );
    }
}
