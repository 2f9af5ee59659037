//! Core data models for pagemeta.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::Error;

// =============================================================================
// METADATA RECORDS
// =============================================================================

/// Page metadata derived from a fetched document.
///
/// Absent tags are represented by empty strings, never by `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    pub keywords: String,
}

/// A persisted extraction result for one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub processed: bool,
}

/// A fully populated record waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMetadataRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub processed: bool,
}

impl NewMetadataRecord {
    /// Build a processed record from a URL and its extracted metadata.
    pub fn processed(url: impl Into<String>, metadata: PageMetadata) -> Self {
        Self {
            url: url.into(),
            title: metadata.title,
            description: metadata.description,
            keywords: metadata.keywords,
            processed: true,
        }
    }

    /// Attach the store-assigned id.
    pub fn into_record(self, id: i64) -> MetadataRecord {
        MetadataRecord {
            id,
            url: self.url,
            title: self.title,
            description: self.description,
            keywords: self.keywords,
            processed: self.processed,
        }
    }
}

// =============================================================================
// JOBS
// =============================================================================

/// Stored status of a job in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    /// Database/wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "succeeded" => Ok(JobStatus::Succeeded),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::Serialization(format!("unknown job status: {other}"))),
        }
    }
}

/// Job state as reported to callers: a stored status, or `Unknown` when the
/// queue holds no bookkeeping for the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl From<JobStatus> for TaskState {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => TaskState::Pending,
            JobStatus::Running => TaskState::Running,
            JobStatus::Succeeded => TaskState::Succeeded,
            JobStatus::Failed => TaskState::Failed,
        }
    }
}

/// A batch-processing job in the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    /// Path of the batch file this job consumes.
    pub batch_path: String,
    pub status: JobStatus,
    /// Run summary written on success.
    pub result: Option<JsonValue>,
    /// Diagnostic written on failure.
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_status_round_trips_through_str() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Succeeded,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_job_status_rejects_unknown_str() {
        assert!("completed".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_task_state_serializes_lowercase() {
        let json = serde_json::to_string(&TaskState::Unknown).unwrap();
        assert_eq!(json, "\"unknown\"");
        let json = serde_json::to_string(&TaskState::from(JobStatus::Succeeded)).unwrap();
        assert_eq!(json, "\"succeeded\"");
    }

    #[test]
    fn test_processed_record_carries_metadata() {
        let record = NewMetadataRecord::processed(
            "https://example.com",
            PageMetadata {
                title: "Example".to_string(),
                ..Default::default()
            },
        )
        .into_record(1);

        assert_eq!(record.id, 1);
        assert_eq!(record.url, "https://example.com");
        assert_eq!(record.title, "Example");
        assert_eq!(record.description, "");
        assert_eq!(record.keywords, "");
        assert!(record.processed);
    }
}
