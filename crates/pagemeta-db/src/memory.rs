//! In-process repository implementations.
//!
//! Used by tests and by `DATABASE_URL=memory://` local runs. They honour the
//! same contracts as the PostgreSQL repositories: batch inserts are atomic,
//! URLs are unique, and job transitions only leave the running state.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tokio::sync::{Notify, RwLock};
use uuid::Uuid;

use pagemeta_core::{
    Error, Job, JobRepository, JobStatus, MetadataRecord, MetadataRepository, NewMetadataRecord,
    Result,
};

// =============================================================================
// METADATA
// =============================================================================

#[derive(Default)]
struct RecordTable {
    last_id: i64,
    by_id: BTreeMap<i64, MetadataRecord>,
    by_url: HashMap<String, i64>,
}

/// In-memory implementation of MetadataRepository.
#[derive(Clone, Default)]
pub struct MemoryMetadataRepository {
    table: Arc<RwLock<RecordTable>>,
}

impl MemoryMetadataRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataRepository for MemoryMetadataRepository {
    async fn insert_batch(&self, records: &[NewMetadataRecord]) -> Result<Vec<i64>> {
        let mut table = self.table.write().await;

        // Validate the whole batch before touching the table.
        let mut seen = HashSet::with_capacity(records.len());
        for record in records {
            if table.by_url.contains_key(&record.url) || !seen.insert(record.url.as_str()) {
                return Err(Error::DuplicateUrl(record.url.clone()));
            }
        }

        let mut ids = Vec::with_capacity(records.len());
        for record in records {
            table.last_id += 1;
            let id = table.last_id;
            table.by_url.insert(record.url.clone(), id);
            table.by_id.insert(id, record.clone().into_record(id));
            ids.push(id);
        }
        Ok(ids)
    }

    async fn get(&self, id: i64) -> Result<Option<MetadataRecord>> {
        Ok(self.table.read().await.by_id.get(&id).cloned())
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<MetadataRecord>> {
        let table = self.table.read().await;
        Ok(table
            .by_url
            .get(url)
            .and_then(|id| table.by_id.get(id))
            .cloned())
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.table.read().await.by_id.len() as i64)
    }
}

// =============================================================================
// JOBS
// =============================================================================

/// In-memory implementation of JobRepository.
#[derive(Clone)]
pub struct MemoryJobRepository {
    jobs: Arc<RwLock<HashMap<Uuid, Job>>>,
    notify: Arc<Notify>,
}

impl Default for MemoryJobRepository {
    fn default() -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            notify: Arc::new(Notify::new()),
        }
    }
}

impl MemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn finish(
        &self,
        job_id: Uuid,
        status: JobStatus,
        result: Option<JsonValue>,
        error: Option<&str>,
    ) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job_id) {
            Some(job) if job.status == JobStatus::Running => {
                job.status = status;
                job.result = result;
                job.error_message = error.map(String::from);
                job.completed_at = Some(Utc::now());
                Ok(())
            }
            _ => Err(Error::Job(format!("job {job_id} is not running"))),
        }
    }
}

#[async_trait]
impl JobRepository for MemoryJobRepository {
    async fn queue(&self, batch_path: &str) -> Result<Uuid> {
        let job = Job {
            id: Uuid::now_v7(),
            batch_path: batch_path.to_string(),
            status: JobStatus::Pending,
            result: None,
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        };
        let job_id = job.id;
        self.jobs.write().await.insert(job_id, job);

        self.notify.notify_waiters();
        Ok(job_id)
    }

    async fn claim_next(&self) -> Result<Option<Job>> {
        let mut jobs = self.jobs.write().await;
        let next = jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending)
            .min_by_key(|job| (job.created_at, job.id))
            .map(|job| job.id);

        Ok(next.and_then(|id| {
            jobs.get_mut(&id).map(|job| {
                job.status = JobStatus::Running;
                job.started_at = Some(Utc::now());
                job.clone()
            })
        }))
    }

    async fn complete(&self, job_id: Uuid, result: Option<JsonValue>) -> Result<()> {
        self.finish(job_id, JobStatus::Succeeded, result, None).await
    }

    async fn fail(&self, job_id: Uuid, error: &str) -> Result<()> {
        self.finish(job_id, JobStatus::Failed, None, Some(error))
            .await
    }

    async fn get(&self, job_id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }

    async fn pending_count(&self) -> Result<i64> {
        let jobs = self.jobs.read().await;
        Ok(jobs
            .values()
            .filter(|job| job.status == JobStatus::Pending)
            .count() as i64)
    }

    async fn fail_orphaned(&self, error: &str) -> Result<u64> {
        let mut jobs = self.jobs.write().await;
        let now = Utc::now();
        let mut affected = 0;
        for job in jobs.values_mut() {
            if job.status == JobStatus::Running {
                job.status = JobStatus::Failed;
                job.error_message = Some(error.to_string());
                job.completed_at = Some(now);
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn purge_finished_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| {
            !(job.status.is_terminal() && job.completed_at.is_some_and(|at| at < cutoff))
        });
        Ok((before - jobs.len()) as u64)
    }

    fn job_notify(&self) -> Arc<Notify> {
        self.notify.clone()
    }
}
