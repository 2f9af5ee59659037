//! Core traits for pagemeta abstractions.
//!
//! These traits define the interfaces that concrete storage backends
//! must satisfy, enabling pluggable backends and testability.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// METADATA REPOSITORY
// =============================================================================

/// Durable storage for metadata records.
#[async_trait]
pub trait MetadataRepository: Send + Sync {
    /// Insert all records as a single unit and return their assigned ids in
    /// input order.
    ///
    /// Fails with `Error::DuplicateUrl` if any URL already exists or repeats
    /// within `records`; nothing is written in that case.
    async fn insert_batch(&self, records: &[NewMetadataRecord]) -> Result<Vec<i64>>;

    /// Get a record by id.
    async fn get(&self, id: i64) -> Result<Option<MetadataRecord>>;

    /// Get a record by URL.
    async fn get_by_url(&self, url: &str) -> Result<Option<MetadataRecord>>;

    /// Total number of stored records.
    async fn count(&self) -> Result<i64>;
}

// =============================================================================
// JOB REPOSITORY
// =============================================================================

/// Job bookkeeping: the queue that hands batch files to the worker and the
/// result store callers poll.
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Queue a new pending job for a batch file.
    async fn queue(&self, batch_path: &str) -> Result<Uuid>;

    /// Atomically move the oldest pending job to running and return it.
    async fn claim_next(&self) -> Result<Option<Job>>;

    /// Mark a running job as succeeded.
    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()>;

    /// Mark a running job as failed.
    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()>;

    /// Get job by id.
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>>;

    /// Get pending jobs count.
    async fn pending_count(&self) -> Result<i64>;

    /// Fail every job still marked running. Returns the number of jobs touched.
    async fn fail_orphaned(&self, error: &str) -> Result<u64>;

    /// Delete terminal jobs completed before `cutoff`. Returns the number deleted.
    async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Notify handle signalled whenever a job is queued.
    fn job_notify(&self) -> Arc<Notify>;
}
