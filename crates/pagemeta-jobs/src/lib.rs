//! # pagemeta-jobs
//!
//! Batch processing for pagemeta.
//!
//! This crate provides:
//! - Page metadata extraction over HTTP
//! - Batch file reading with guaranteed cleanup
//! - The batch runner that turns a file into stored records
//! - A background worker fed by the job queue
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pagemeta_db::Database;
//! use pagemeta_jobs::{BatchHandler, BatchRunner, HttpExtractor, JobQueue, WorkerBuilder};
//!
//! let db = Database::connect("postgres://...").await?;
//! let runner = BatchRunner::new(Arc::new(HttpExtractor::with_default_timeout()?), db.records.clone());
//!
//! let handle = WorkerBuilder::new(db.clone())
//!     .with_handler(BatchHandler::new(runner))
//!     .build()?
//!     .start();
//!
//! let queue = JobQueue::new(db.jobs.clone());
//! let job_id = queue.submit("/tmp/pagemeta/urls.csv").await?;
//!
//! // Graceful shutdown
//! handle.shutdown().await?;
//! ```

pub mod batch;
pub mod extractor;
pub mod handler;
pub mod queue;
pub mod runner;
pub mod worker;

// Re-export core types
pub use pagemeta_core::*;

pub use batch::BatchFile;
pub use extractor::{parse_page, HttpExtractor, MetadataExtractor};
pub use handler::{BatchHandler, JobContext, JobHandler, JobResult};
pub use queue::{JobQueue, TaskReport};
pub use runner::{BatchRunner, RunSummary};
pub use worker::{JobWorker, WorkerBuilder, WorkerConfig, WorkerEvent, WorkerHandle};

/// Default polling interval for job processing (milliseconds).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = pagemeta_core::defaults::JOB_POLL_INTERVAL_MS;
