//! Batch runner: turns one uploaded batch file into metadata records.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use pagemeta_core::{defaults, MetadataRepository, NewMetadataRecord, Result};

use crate::batch::BatchFile;
use crate::extractor::MetadataExtractor;

/// Outcome of a successful run, stored as the job result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Always "Processing completed".
    pub message: String,
    /// Non-blank URL rows read from the batch file.
    pub rows: usize,
    /// Records written.
    pub persisted: usize,
    /// Rows whose page could not be fetched.
    pub skipped: usize,
}

/// Processes batch files with an extractor and a record store.
#[derive(Clone)]
pub struct BatchRunner {
    extractor: Arc<dyn MetadataExtractor>,
    records: Arc<dyn MetadataRepository>,
}

impl BatchRunner {
    pub fn new(
        extractor: Arc<dyn MetadataExtractor>,
        records: Arc<dyn MetadataRepository>,
    ) -> Self {
        Self { extractor, records }
    }

    /// Process the batch file at `batch_path`.
    ///
    /// URLs are fetched one at a time; failures are skipped. The successful
    /// extractions are stored in a single transaction, so a duplicate URL
    /// anywhere in the batch stores nothing. The file is deleted before this
    /// returns, on success and on error.
    pub async fn run(&self, batch_path: impl AsRef<Path>) -> Result<RunSummary> {
        let start = Instant::now();
        let batch = BatchFile::claim(batch_path.as_ref());
        let urls = batch.read_urls().await?;

        let mut pending = Vec::with_capacity(urls.len());
        for url in &urls {
            match self.extractor.extract(url).await {
                Some(metadata) => pending.push(NewMetadataRecord::processed(url.as_str(), metadata)),
                None => debug!(
                    subsystem = "jobs",
                    component = "runner",
                    url = %url,
                    "No metadata extracted, skipping row"
                ),
            }
        }

        self.records.insert_batch(&pending).await?;

        let summary = RunSummary {
            message: defaults::JOB_COMPLETED_MESSAGE.to_string(),
            rows: urls.len(),
            persisted: pending.len(),
            skipped: urls.len() - pending.len(),
        };
        info!(
            subsystem = "jobs",
            component = "runner",
            batch_path = %batch.path().display(),
            rows = summary.rows,
            persisted = summary.persisted,
            skipped = summary.skipped,
            duration_ms = start.elapsed().as_millis() as u64,
            "Batch processed"
        );
        Ok(summary)
    }
}
