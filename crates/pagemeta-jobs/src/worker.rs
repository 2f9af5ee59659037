//! Job worker that drains the batch queue in the background.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use pagemeta_core::{defaults, Error, Job, JobRepository, Result};
use pagemeta_db::Database;

use crate::handler::{JobContext, JobHandler, JobResult};
use crate::DEFAULT_POLL_INTERVAL_MS;

/// Configuration for the job worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Polling interval in milliseconds when no wake-up arrives.
    pub poll_interval_ms: u64,
    /// Whether to enable job processing.
    pub enabled: bool,
    /// How long finished jobs stay queryable, in seconds.
    pub result_ttl_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            enabled: true,
            result_ttl_secs: defaults::JOB_RESULT_TTL_SECS,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `JOB_WORKER_ENABLED` | `true` | Enable/disable job processing |
    /// | `JOB_POLL_INTERVAL_MS` | `500` | Polling interval when queue is empty |
    /// | `JOB_RESULT_TTL_SECS` | `86400` | Retention of finished job status |
    pub fn from_env() -> Self {
        let enabled = std::env::var("JOB_WORKER_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let poll_interval_ms = std::env::var("JOB_POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);

        let result_ttl_secs = std::env::var("JOB_RESULT_TTL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::JOB_RESULT_TTL_SECS);

        Self {
            poll_interval_ms,
            enabled,
            result_ttl_secs,
        }
    }

    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Enable or disable job processing.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set how long finished jobs remain queryable.
    pub fn with_result_ttl(mut self, secs: u64) -> Self {
        self.result_ttl_secs = secs;
        self
    }
}

/// Event emitted by the job worker.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// A job was started.
    JobStarted { job_id: Uuid },
    /// A job completed successfully.
    JobCompleted { job_id: Uuid },
    /// A job failed.
    JobFailed { job_id: Uuid, error: String },
    /// Worker started.
    WorkerStarted,
    /// Worker stopped.
    WorkerStopped,
}

/// Handle for controlling a running worker.
pub struct WorkerHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Stop claiming jobs and wait for the ones in flight to finish.
    pub async fn shutdown(self) -> Result<()> {
        // A closed channel means the loop already exited.
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| Error::Internal(format!("Job worker task failed: {e}")))
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }
}

/// Job worker that processes jobs from the queue.
///
/// Every pending job is claimed and spawned as soon as the worker is woken,
/// with no limit on how many run at once.
pub struct JobWorker {
    db: Database,
    config: WorkerConfig,
    handler: Arc<dyn JobHandler>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorker {
    /// Create a new job worker.
    pub fn new(db: Database, config: WorkerConfig, handler: Arc<dyn JobHandler>) -> Self {
        let (event_tx, _) = broadcast::channel(defaults::EVENT_BUS_CAPACITY);
        Self {
            db,
            config,
            handler,
            event_tx,
        }
    }

    /// Start the worker and return a handle for control.
    pub fn start(self) -> WorkerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();

        let task = tokio::spawn(async move {
            self.run(&mut shutdown_rx).await;
        });

        WorkerHandle {
            shutdown_tx,
            event_rx,
            task,
        }
    }

    /// Run the worker loop.
    ///
    /// Sleeps until a job is queued (or the poll interval elapses), then
    /// claims everything pending. Finished-job bookkeeping older than the
    /// result TTL is purged periodically.
    #[instrument(skip(self, shutdown_rx))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Job worker is disabled, not starting");
            return;
        }

        // Jobs left running by a previous process will never finish.
        if let Err(e) = self
            .db
            .jobs
            .fail_orphaned(defaults::JOB_INTERRUPTED_MESSAGE)
            .await
        {
            error!(error = ?e, "Failed to fail orphaned jobs");
        }

        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            result_ttl_secs = self.config.result_ttl_secs,
            "Job worker started"
        );

        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);
        let purge_interval = Duration::from_secs(defaults::JOB_PURGE_INTERVAL_SECS);
        let notify = self.db.jobs.job_notify();
        let mut tasks = JoinSet::new();
        let mut last_purge: Option<Instant> = None;

        loop {
            // Register for wake-ups before claiming so a job queued while we
            // drain is not missed.
            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            while let Some(result) = tasks.try_join_next() {
                if let Err(e) = result {
                    error!(error = ?e, "Job task panicked");
                }
            }

            if last_purge.map_or(true, |at| at.elapsed() >= purge_interval) {
                self.purge_expired().await;
                last_purge = Some(Instant::now());
            }

            let mut claimed = 0;
            while let Some(job) = self.claim_job().await {
                claimed += 1;
                let worker = self.clone_refs();
                tasks.spawn(async move {
                    worker.execute_job(job).await;
                });
            }
            if claimed > 0 {
                debug!(claimed, in_flight = tasks.len(), "Dispatched jobs");
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Job worker received shutdown signal");
                    break;
                }
                _ = &mut notified => {}
                _ = sleep(poll_interval) => {}
            }
        }

        if !tasks.is_empty() {
            info!(in_flight = tasks.len(), "Waiting for in-flight jobs");
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                error!(error = ?e, "Job task panicked");
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("Job worker stopped");
    }

    /// Claim the next available job without processing it.
    async fn claim_job(&self) -> Option<Job> {
        match self.db.jobs.claim_next().await {
            Ok(job) => job,
            Err(e) => {
                error!(error = ?e, "Failed to claim job");
                None
            }
        }
    }

    /// Drop expired job bookkeeping and report pool usage.
    async fn purge_expired(&self) {
        let Some(cutoff) = purge_cutoff(Utc::now(), self.config.result_ttl_secs) else {
            debug!(
                result_ttl_secs = self.config.result_ttl_secs,
                "Result TTL exceeds the clock range, skipping purge"
            );
            return;
        };
        match self.db.jobs.purge_finished_before(cutoff).await {
            Ok(0) => {}
            Ok(purged) => debug!(purged, "Purged expired job records"),
            Err(e) => warn!(error = ?e, "Failed to purge expired job records"),
        }
        if let Some(pool) = self.db.pool() {
            pagemeta_db::log_pool_usage(pool);
        }
    }

    /// Clone references needed for spawned job tasks.
    fn clone_refs(&self) -> JobWorkerRef {
        JobWorkerRef {
            jobs: self.db.jobs.clone(),
            handler: self.handler.clone(),
            event_tx: self.event_tx.clone(),
        }
    }

    /// Get a receiver for worker events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Get the pending job count.
    pub async fn pending_count(&self) -> Result<i64> {
        self.db.jobs.pending_count().await
    }
}

/// Completion time before which finished jobs are purged. `None` when the TTL
/// reaches past the representable time range, so nothing has expired.
fn purge_cutoff(now: DateTime<Utc>, ttl_secs: u64) -> Option<DateTime<Utc>> {
    let ttl = chrono::Duration::try_seconds(i64::try_from(ttl_secs).ok()?)?;
    now.checked_sub_signed(ttl)
}

/// Lightweight reference bundle for executing a single job in a spawned task.
struct JobWorkerRef {
    jobs: Arc<dyn JobRepository>,
    handler: Arc<dyn JobHandler>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl JobWorkerRef {
    /// Execute a single claimed job and record its outcome.
    ///
    /// The handler runs in its own task so a panic still ends the job as
    /// failed instead of leaving it running.
    async fn execute_job(self, job: Job) {
        let start = Instant::now();
        let job_id = job.id;

        info!(%job_id, batch_path = %job.batch_path, "Processing job");

        let _ = self.event_tx.send(WorkerEvent::JobStarted { job_id });

        let handler = self.handler.clone();
        let task = tokio::spawn(async move { handler.execute(JobContext::new(job)).await });
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = ?e, %job_id, "Job handler panicked");
                JobResult::Failed(format!("job handler panicked: {e}"))
            }
        };

        let error = match outcome {
            JobResult::Success(data) => match self.jobs.complete(job_id, data).await {
                Ok(()) => {
                    info!(
                        %job_id,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Job completed successfully"
                    );
                    let _ = self.event_tx.send(WorkerEvent::JobCompleted { job_id });
                    return;
                }
                Err(e) => {
                    error!(error = ?e, %job_id, "Failed to mark job as completed");
                    format!("failed to record job result: {e}")
                }
            },
            JobResult::Failed(error) => error,
        };

        if let Err(e) = self.jobs.fail(job_id, &error).await {
            error!(error = ?e, %job_id, "Failed to mark job as failed");
            return;
        }
        warn!(
            %job_id,
            %error,
            duration_ms = start.elapsed().as_millis() as u64,
            "Job failed"
        );
        let _ = self.event_tx.send(WorkerEvent::JobFailed { job_id, error });
    }
}

/// Builder for creating a job worker.
pub struct WorkerBuilder {
    db: Database,
    config: WorkerConfig,
    handler: Option<Arc<dyn JobHandler>>,
}

impl WorkerBuilder {
    /// Create a new worker builder.
    pub fn new(db: Database) -> Self {
        Self {
            db,
            config: WorkerConfig::default(),
            handler: None,
        }
    }

    /// Set the worker configuration.
    pub fn with_config(mut self, config: WorkerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the handler that executes claimed jobs.
    pub fn with_handler<H: JobHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Build and return the worker.
    pub fn build(self) -> Result<JobWorker> {
        let handler = self
            .handler
            .ok_or_else(|| Error::Config("job worker requires a handler".into()))?;
        Ok(JobWorker::new(self.db, self.config, handler))
    }
}
