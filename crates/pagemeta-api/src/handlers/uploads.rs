//! Batch upload endpoint.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};

use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub task_id: String,
}

/// Accept a CSV batch file and queue it for processing.
///
/// # Multipart Fields
/// - `file` (required): the batch file; its filename names the stored copy
///
/// # Returns
/// - 200 OK with `{"task_id": ...}`
/// - 400 Bad Request if the file field or its filename is missing
/// - 409 Conflict if a batch with the same filename is still being processed
pub async fn upload_batch(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("Uploaded file has no filename".to_string()))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Read error: {}", e)))?;
        upload = Some((filename, data));
        break;
    }

    let (filename, data) = upload
        .ok_or_else(|| ApiError::BadRequest("Missing file in multipart form".to_string()))?;

    let path = state.uploads.store(&filename, &data).await?;
    let batch_path = path.to_string_lossy().into_owned();

    let task_id = match state.queue.submit(&batch_path).await {
        Ok(id) => id,
        Err(e) => {
            // Nothing will ever consume the file.
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                warn!(
                    subsystem = "api",
                    batch_path = %batch_path,
                    error = %remove_err,
                    "Failed to remove unqueued batch file"
                );
            }
            return Err(e.into());
        }
    };

    info!(
        subsystem = "api",
        component = "uploads",
        job_id = %task_id,
        batch_path = %batch_path,
        size = data.len(),
        "Batch uploaded"
    );

    Ok(Json(UploadResponse {
        task_id: task_id.to_string(),
    }))
}
