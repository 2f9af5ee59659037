//! Upload storage for batch files.
//!
//! Uploaded CSV files are written under a single base directory using the
//! client's sanitized filename. A name that is still on disk (its batch has
//! not finished yet) is refused rather than overwritten.
//!
//! ## Example
//!
//! ```rust,ignore
//! use pagemeta_db::UploadStore;
//!
//! let store = UploadStore::new("/tmp/pagemeta");
//! let path = store.store("urls.csv", &bytes).await?;
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use pagemeta_core::{sanitize_filename, Error, Result};

/// Filesystem directory holding uploaded batch files.
#[derive(Debug, Clone)]
pub struct UploadStore {
    base_path: PathBuf,
}

impl UploadStore {
    /// Create a store rooted at `base_path`.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Validate that the upload directory is writable.
    ///
    /// Performs a round-trip: create dir, write, read back, delete.
    /// Returns a human-readable error naming the step that failed.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("probe.csv");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"URL\nhttps://example.com\n";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await; // Best-effort cleanup

        Ok(())
    }

    /// Persist an uploaded file and return its absolute location.
    ///
    /// Fails with `Error::InvalidInput` when the filename sanitizes to nothing
    /// and with `Error::Conflict` when a file of that name is already pending.
    pub async fn store(&self, filename: &str, data: &[u8]) -> Result<PathBuf> {
        let safe_name = sanitize_filename(filename)
            .ok_or_else(|| Error::InvalidInput(format!("invalid filename: {filename:?}")))?;

        fs::create_dir_all(&self.base_path).await?;
        let path = self.base_path.join(&safe_name);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::Conflict(format!(
                    "a batch named {safe_name} is already being processed"
                )));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let written = async {
            file.write_all(data).await?;
            file.flush().await
        }
        .await;

        if let Err(e) = written {
            warn!(
                subsystem = "uploads",
                batch_path = %path.display(),
                error = %e,
                "Upload write failed, removing partial file"
            );
            let _ = fs::remove_file(&path).await;
            return Err(Error::Io(e));
        }

        debug!(
            subsystem = "uploads",
            batch_path = %path.display(),
            size = data.len(),
            "Stored batch file"
        );
        Ok(path)
    }
}
