//! Job status endpoint.

use axum::extract::{Path, State};
use axum::Json;

use pagemeta_jobs::TaskReport;

use crate::{ApiError, AppState};

/// Report a job's state. Ids the queue does not know answer `unknown`.
pub async fn get_status(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskReport>, ApiError> {
    Ok(Json(state.queue.status(&task_id).await?))
}
