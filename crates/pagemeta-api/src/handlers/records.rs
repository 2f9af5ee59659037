//! Metadata record lookup.

use axum::extract::{Path, State};
use axum::Json;

use pagemeta_core::{MetadataRecord, MetadataRepository};

use crate::{ApiError, AppState};

/// Fetch one stored metadata record by numeric id.
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MetadataRecord>, ApiError> {
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid record id: {id}")))?;

    state
        .db
        .records
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Metadata record {id} not found")))
}
