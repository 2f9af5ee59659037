//! Job handlers.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use pagemeta_core::Job;

use crate::runner::BatchRunner;

/// Context provided to job handlers.
pub struct JobContext {
    /// The job being processed.
    pub job: Job,
}

impl JobContext {
    /// Create a new job context.
    pub fn new(job: Job) -> Self {
        Self { job }
    }

    pub fn job_id(&self) -> Uuid {
        self.job.id
    }

    /// Location of the batch file this job processes.
    pub fn batch_path(&self) -> &str {
        &self.job.batch_path
    }
}

/// Result of job execution.
#[derive(Debug)]
pub enum JobResult {
    /// Job completed successfully with optional result data.
    Success(Option<JsonValue>),
    /// Job failed with an error message.
    Failed(String),
}

/// Trait for job handlers.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Execute the job.
    async fn execute(&self, ctx: JobContext) -> JobResult;
}

/// Runs a claimed job's batch file through the [`BatchRunner`].
pub struct BatchHandler {
    runner: BatchRunner,
}

impl BatchHandler {
    pub fn new(runner: BatchRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl JobHandler for BatchHandler {
    async fn execute(&self, ctx: JobContext) -> JobResult {
        match self.runner.run(ctx.batch_path()).await {
            Ok(summary) => match serde_json::to_value(&summary) {
                Ok(value) => JobResult::Success(Some(value)),
                Err(e) => JobResult::Failed(format!("failed to encode run summary: {e}")),
            },
            Err(e) => JobResult::Failed(e.to_string()),
        }
    }
}
