//! Batch file access.
//!
//! A batch file is a CSV document with a header row; the `URL` column names
//! one page per row. [`BatchFile`] owns the file for the duration of a run and
//! removes it when dropped, whatever the outcome.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use pagemeta_core::{defaults, Error, Result};

/// Scoped ownership of an uploaded batch file.
#[derive(Debug)]
pub struct BatchFile {
    path: PathBuf,
}

impl BatchFile {
    /// Take ownership of the file at `path`. It is deleted on drop.
    pub fn claim(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the non-blank values of the `URL` column, in file order.
    pub async fn read_urls(&self) -> Result<Vec<String>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|e| {
            Error::BatchFile(format!("cannot read {}: {e}", self.path.display()))
        })?;
        parse_urls(&bytes)
    }
}

impl Drop for BatchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(
                subsystem = "jobs",
                component = "batch",
                batch_path = %self.path.display(),
                "Removed batch file"
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                subsystem = "jobs",
                component = "batch",
                batch_path = %self.path.display(),
                error = %e,
                "Failed to remove batch file"
            ),
        }
    }
}

/// Parse CSV bytes and return the non-blank cells of the `URL` column.
pub fn parse_urls(bytes: &[u8]) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| Error::BatchFile(format!("invalid header row: {e}")))?;
    let column = headers
        .iter()
        .position(|h| h == defaults::BATCH_URL_COLUMN)
        .ok_or_else(|| {
            Error::BatchFile(format!(
                "missing required column {:?}",
                defaults::BATCH_URL_COLUMN
            ))
        })?;

    let mut urls = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row.map_err(|e| Error::BatchFile(format!("row {}: {e}", index + 1)))?;
        match row.get(column) {
            Some(url) if !url.trim().is_empty() => urls.push(url.to_string()),
            _ => {}
        }
    }
    Ok(urls)
}
