//! Server configuration loaded from the environment.

use std::path::PathBuf;
use std::time::Duration;

use pagemeta_core::defaults;
use pagemeta_db::PoolConfig;

/// Settings for the HTTP server and its collaborators.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `DATABASE_URL` | `postgres://localhost/pagemeta` | PostgreSQL URL, or `memory://` |
/// | `HOST` | `0.0.0.0` | Bind address |
/// | `PORT` | `3000` | Bind port |
/// | `UPLOAD_DIR` | `/tmp/pagemeta` | Where uploaded batch files wait |
/// | `MAX_UPLOAD_BYTES` | `10485760` | Request body limit |
/// | `FETCH_TIMEOUT_SECS` | `10` | Per-URL fetch timeout |
/// | `DB_MAX_CONNECTIONS` | `10` | PostgreSQL pool size (must be positive) |
/// | `DB_ACQUIRE_TIMEOUT_SECS` | `30` | Wait for a free pooled connection |
///
/// Worker settings are read separately by `WorkerConfig::from_env`.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub fetch_timeout_secs: u64,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
            host: defaults::SERVER_HOST.to_string(),
            port: defaults::SERVER_PORT,
            upload_dir: PathBuf::from(defaults::UPLOAD_DIR),
            max_upload_bytes: defaults::MAX_UPLOAD_BYTES,
            fetch_timeout_secs: defaults::FETCH_TIMEOUT_SECS,
            db_max_connections: defaults::DB_MAX_CONNECTIONS,
            db_acquire_timeout_secs: defaults::DB_ACQUIRE_TIMEOUT_SECS,
        }
    }
}

impl AppConfig {
    /// Create config from environment variables (with defaults).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparsable numbers fall back
    /// to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base = Self::default();
        Self {
            database_url: lookup("DATABASE_URL").unwrap_or(base.database_url),
            host: lookup("HOST").unwrap_or(base.host),
            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.port),
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(base.upload_dir),
            max_upload_bytes: lookup("MAX_UPLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.max_upload_bytes),
            fetch_timeout_secs: lookup("FETCH_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.fetch_timeout_secs),
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .filter(|&n: &u32| n > 0)
                .unwrap_or(base.db_max_connections),
            db_acquire_timeout_secs: lookup("DB_ACQUIRE_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(base.db_acquire_timeout_secs),
        }
    }

    /// Set the upload directory.
    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    /// Set the request body limit.
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Pool sizing for [`pagemeta_db::Database::connect_with_config`].
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_connections: self.db_max_connections,
            acquire_timeout: Duration::from_secs(self.db_acquire_timeout_secs),
        }
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
