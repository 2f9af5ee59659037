//! Centralized default constants for pagemeta.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic numbers.

// =============================================================================
// EXTRACTION
// =============================================================================

/// Per-URL fetch timeout in seconds.
pub const FETCH_TIMEOUT_SECS: u64 = 10;

/// User-Agent sent with outbound page fetches.
pub const FETCH_USER_AGENT: &str = concat!("pagemeta/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// BATCH FILES
// =============================================================================

/// Header of the batch file column holding the URLs.
pub const BATCH_URL_COLUMN: &str = "URL";

/// Directory where uploaded batch files are stored.
pub const UPLOAD_DIR: &str = "/tmp/pagemeta";

/// Maximum accepted upload body size in bytes (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// =============================================================================
// JOBS
// =============================================================================

/// Terminal message reported by a successful batch run.
pub const JOB_COMPLETED_MESSAGE: &str = "Processing completed";

/// Worker polling interval when the queue is empty (milliseconds).
pub const JOB_POLL_INTERVAL_MS: u64 = 500;

/// How long terminal job bookkeeping is retained before it reads as unknown.
pub const JOB_RESULT_TTL_SECS: u64 = 86_400;

/// Minimum spacing between purges of expired job bookkeeping (seconds).
pub const JOB_PURGE_INTERVAL_SECS: u64 = 60;

/// Error recorded for jobs a previous worker left in the running state.
pub const JOB_INTERRUPTED_MESSAGE: &str = "interrupted by worker restart";

/// Capacity of the worker event broadcast channel.
pub const EVENT_BUS_CAPACITY: usize = 256;

// =============================================================================
// SERVER
// =============================================================================

/// Default bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const SERVER_PORT: u16 = 3000;

/// Default database URL.
pub const DATABASE_URL: &str = "postgres://localhost/pagemeta";

/// Maximum open PostgreSQL connections.
pub const DB_MAX_CONNECTIONS: u32 = 10;

/// Seconds to wait for a free pooled connection.
pub const DB_ACQUIRE_TIMEOUT_SECS: u64 = 30;
