//! Submission and status lookup for batch jobs.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use pagemeta_core::{JobRepository, Result, TaskState};

/// Status report for one job id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskReport {
    pub task_id: String,
    pub status: TaskState,
    /// Failure diagnostic, present only for failed jobs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Front door to the job queue.
#[derive(Clone)]
pub struct JobQueue {
    jobs: Arc<dyn JobRepository>,
}

impl JobQueue {
    pub fn new(jobs: Arc<dyn JobRepository>) -> Self {
        Self { jobs }
    }

    /// Queue a batch file for processing and return the job id.
    pub async fn submit(&self, batch_path: &str) -> Result<Uuid> {
        let job_id = self.jobs.queue(batch_path).await?;
        info!(
            subsystem = "jobs",
            component = "queue",
            op = "submit",
            %job_id,
            batch_path,
            "Batch job queued"
        );
        Ok(job_id)
    }

    /// Report the state of `task_id`.
    ///
    /// Ids that do not parse, were never issued, or whose bookkeeping has
    /// expired all report `unknown`.
    pub async fn status(&self, task_id: &str) -> Result<TaskReport> {
        let job = match Uuid::parse_str(task_id) {
            Ok(id) => self.jobs.get(id).await?,
            Err(_) => None,
        };

        let (status, error) = match job {
            Some(job) => (TaskState::from(job.status), job.error_message),
            None => (TaskState::Unknown, None),
        };

        Ok(TaskReport {
            task_id: task_id.to_string(),
            status,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagemeta_db::MemoryJobRepository;

    #[tokio::test]
    async fn test_submitted_job_is_pending() {
        let queue = JobQueue::new(Arc::new(MemoryJobRepository::new()));
        let id = queue.submit("/tmp/a.csv").await.unwrap();

        let report = queue.status(&id.to_string()).await.unwrap();
        assert_eq!(report.status, TaskState::Pending);
        assert_eq!(report.task_id, id.to_string());
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_failed_job_reports_error() {
        let repo = Arc::new(MemoryJobRepository::new());
        let queue = JobQueue::new(repo.clone());
        let id = queue.submit("/tmp/a.csv").await.unwrap();
        repo.claim_next().await.unwrap();
        repo.fail(id, "Batch file error: missing required column \"URL\"")
            .await
            .unwrap();

        let report = queue.status(&id.to_string()).await.unwrap();
        assert_eq!(report.status, TaskState::Failed);
        assert!(report.error.unwrap().contains("URL"));
    }

    #[tokio::test]
    async fn test_unknown_ids() {
        let queue = JobQueue::new(Arc::new(MemoryJobRepository::new()));

        let never = queue.status(&Uuid::now_v7().to_string()).await.unwrap();
        assert_eq!(never.status, TaskState::Unknown);

        let garbage = queue.status("not-a-job").await.unwrap();
        assert_eq!(garbage.status, TaskState::Unknown);
        assert_eq!(garbage.task_id, "not-a-job");
    }

    #[test]
    fn test_report_omits_absent_error() {
        let report = TaskReport {
            task_id: "x".into(),
            status: TaskState::Running,
            error: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({"task_id": "x", "status": "running"}));
    }
}
