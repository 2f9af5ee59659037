//! End-to-end tests for the batch pipeline.
//!
//! Covers upload-to-record flow over the in-memory store:
//! - Job lifecycle pending -> running -> succeeded
//! - Only fetchable URLs become records
//! - Batch files are removed on success and on failure
//! - A URL already stored makes the whole second batch fail
//! - Two batches racing on the same URL: exactly one is stored
//!
//! Pages are served by wiremock, so no outbound network access is needed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pagemeta_db::Database;
use pagemeta_jobs::{
    BatchHandler, BatchRunner, HttpExtractor, JobQueue, MetadataExtractor, MetadataRepository,
    PageMetadata, TaskState, WorkerBuilder, WorkerConfig, WorkerHandle,
};
use tokio::sync::Semaphore;
use tokio::time::sleep;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

async fn page_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/example"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<title>Example</title>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/full"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><title>Full</title>
               <meta name="description" content="All fields">
               <meta name="keywords" content="x,y"></head></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;
    server
}

fn write_batch(dir: &tempfile::TempDir, name: &str, urls: &[String]) -> PathBuf {
    let mut body = String::from("URL\n");
    for url in urls {
        body.push_str(url);
        body.push('\n');
    }
    let path = dir.path().join(name);
    std::fs::write(&path, body).expect("write batch file");
    path
}

fn start_worker(db: &Database, extractor: Arc<dyn MetadataExtractor>) -> WorkerHandle {
    let runner = BatchRunner::new(extractor, db.records.clone());
    WorkerBuilder::new(db.clone())
        .with_config(WorkerConfig::default().with_poll_interval(25))
        .with_handler(BatchHandler::new(runner))
        .build()
        .expect("build worker")
        .start()
}

async fn wait_for_state(queue: &JobQueue, task_id: &str, expected: TaskState) -> bool {
    for _ in 0..200 {
        if queue.status(task_id).await.unwrap().status == expected {
            return true;
        }
        sleep(Duration::from_millis(25)).await;
    }
    false
}

async fn wait_for_terminal(queue: &JobQueue, task_id: &str) -> TaskState {
    for _ in 0..200 {
        let state = queue.status(task_id).await.unwrap().status;
        if matches!(state, TaskState::Succeeded | TaskState::Failed) {
            return state;
        }
        sleep(Duration::from_millis(25)).await;
    }
    TaskState::Unknown
}

/// Extractor that blocks until the test releases a permit.
struct GatedExtractor {
    gate: Arc<Semaphore>,
    inner: HttpExtractor,
}

#[async_trait]
impl MetadataExtractor for GatedExtractor {
    async fn extract(&self, url: &str) -> Option<PageMetadata> {
        let _permit = self.gate.acquire().await.ok()?;
        self.inner.extract(url).await
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_batch_lifecycle_and_records() {
    let server = page_server().await;
    let dir = tempfile::tempdir().unwrap();
    let db = Database::in_memory();
    let queue = JobQueue::new(db.jobs.clone());

    let urls = vec![
        format!("{}/example", server.uri()),
        format!("{}/gone", server.uri()),
        format!("{}/full", server.uri()),
    ];
    let batch = write_batch(&dir, "urls.csv", &urls);

    let task_id = queue.submit(batch.to_str().unwrap()).await.unwrap().to_string();
    assert_eq!(
        queue.status(&task_id).await.unwrap().status,
        TaskState::Pending
    );

    let gate = Arc::new(Semaphore::new(0));
    let handle = start_worker(
        &db,
        Arc::new(GatedExtractor {
            gate: gate.clone(),
            inner: HttpExtractor::with_default_timeout().unwrap(),
        }),
    );

    assert!(wait_for_state(&queue, &task_id, TaskState::Running).await);
    gate.add_permits(urls.len());
    assert!(wait_for_state(&queue, &task_id, TaskState::Succeeded).await);

    assert_eq!(db.records.count().await.unwrap(), 2);
    assert!(db.records.get_by_url(&urls[1]).await.unwrap().is_none());

    let example = db.records.get_by_url(&urls[0]).await.unwrap().unwrap();
    assert_eq!(example.title, "Example");
    assert_eq!(example.description, "");
    assert_eq!(example.keywords, "");
    assert!(example.processed);

    let full = db.records.get_by_url(&urls[2]).await.unwrap().unwrap();
    assert_eq!(full.description, "All fields");
    assert_eq!(full.keywords, "x,y");

    assert!(!batch.exists());
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_missing_url_column_fails_job_and_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::in_memory();
    let queue = JobQueue::new(db.jobs.clone());
    let handle = start_worker(&db, Arc::new(HttpExtractor::with_default_timeout().unwrap()));

    let batch = dir.path().join("bad.csv");
    std::fs::write(&batch, "Link\nhttps://example.com\n").unwrap();
    let task_id = queue.submit(batch.to_str().unwrap()).await.unwrap().to_string();

    assert!(wait_for_state(&queue, &task_id, TaskState::Failed).await);
    let report = queue.status(&task_id).await.unwrap();
    assert!(report.error.unwrap().contains("URL"));
    assert!(!batch.exists());
    assert_eq!(db.records.count().await.unwrap(), 0);

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_duplicate_url_in_second_batch_fails_it() {
    let server = page_server().await;
    let dir = tempfile::tempdir().unwrap();
    let db = Database::in_memory();
    let queue = JobQueue::new(db.jobs.clone());
    let handle = start_worker(&db, Arc::new(HttpExtractor::with_default_timeout().unwrap()));

    let example = format!("{}/example", server.uri());
    let full = format!("{}/full", server.uri());

    let first = write_batch(&dir, "first.csv", &[example.clone()]);
    let first_id = queue.submit(first.to_str().unwrap()).await.unwrap().to_string();
    assert!(wait_for_state(&queue, &first_id, TaskState::Succeeded).await);

    let second = write_batch(&dir, "second.csv", &[full.clone(), example.clone()]);
    let second_id = queue.submit(second.to_str().unwrap()).await.unwrap().to_string();
    assert!(wait_for_state(&queue, &second_id, TaskState::Failed).await);

    let report = queue.status(&second_id).await.unwrap();
    assert!(report.error.unwrap().starts_with("Duplicate url"));
    assert!(db.records.get_by_url(&full).await.unwrap().is_none());
    assert_eq!(db.records.count().await.unwrap(), 1);
    assert!(!second.exists());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_batches_sharing_a_url_store_it_once() {
    let server = page_server().await;
    let dir = tempfile::tempdir().unwrap();
    let db = Database::in_memory();
    let queue = JobQueue::new(db.jobs.clone());

    let example = format!("{}/example", server.uri());
    let full = format!("{}/full", server.uri());
    let other = format!("{}/example?page=2", server.uri());

    let first = write_batch(&dir, "first.csv", &[example.clone(), full.clone()]);
    let second = write_batch(&dir, "second.csv", &[other.clone(), example.clone()]);
    let first_id = queue.submit(first.to_str().unwrap()).await.unwrap().to_string();
    let second_id = queue.submit(second.to_str().unwrap()).await.unwrap().to_string();

    let gate = Arc::new(Semaphore::new(0));
    let handle = start_worker(
        &db,
        Arc::new(GatedExtractor {
            gate: gate.clone(),
            inner: HttpExtractor::with_default_timeout().unwrap(),
        }),
    );

    // Both jobs are in flight before any page is fetched.
    assert!(wait_for_state(&queue, &first_id, TaskState::Running).await);
    assert!(wait_for_state(&queue, &second_id, TaskState::Running).await);
    gate.add_permits(4);

    let first_state = wait_for_terminal(&queue, &first_id).await;
    let second_state = wait_for_terminal(&queue, &second_id).await;
    let (winner, loser_id) = match (first_state, second_state) {
        (TaskState::Succeeded, TaskState::Failed) => (&full, &second_id),
        (TaskState::Failed, TaskState::Succeeded) => (&other, &first_id),
        states => panic!("expected one success and one failure, got {states:?}"),
    };

    let report = queue.status(loser_id).await.unwrap();
    assert!(report.error.unwrap().starts_with("Duplicate url"));

    assert!(db.records.get_by_url(&example).await.unwrap().is_some());
    assert!(db.records.get_by_url(winner).await.unwrap().is_some());
    assert_eq!(db.records.count().await.unwrap(), 2);
    assert!(!first.exists());
    assert!(!second.exists());

    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unknown_task_id() {
    let db = Database::in_memory();
    let queue = JobQueue::new(db.jobs.clone());
    let report = queue
        .status("0190f5e2-0000-7000-8000-000000000000")
        .await
        .unwrap();
    assert_eq!(report.status, TaskState::Unknown);
}
