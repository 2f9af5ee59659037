//! HTTP handlers for pagemeta-api.

pub mod records;
pub mod tasks;
pub mod uploads;

use axum::Json;
use serde_json::{json, Value};

pub use records::get_record;
pub use tasks::get_status;
pub use uploads::upload_batch;

/// Liveness probe.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
