//! pagemeta-api - HTTP surface for batch page metadata extraction
//!
//! | Method | Path | Response |
//! |--------|------|----------|
//! | POST | `/upload` | `{"task_id"}` |
//! | GET | `/status/:task_id` | `{"task_id", "status", "error"?}` |
//! | GET | `/results/:id` | stored metadata record |
//! | GET | `/health` | `{"status": "ok"}` |

pub mod config;
pub mod error;
pub mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

use pagemeta_db::{Database, UploadStore};
use pagemeta_jobs::JobQueue;

pub use config::AppConfig;
pub use error::ApiError;

// =============================================================================
// REQUEST ID (UUIDv7)
// =============================================================================

/// Generates time-ordered UUIDv7 request correlation IDs.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub queue: JobQueue,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(db: Database, uploads: UploadStore) -> Self {
        let queue = JobQueue::new(db.jobs.clone());
        Self { db, queue, uploads }
    }
}

/// Assemble the router with tracing, request ids and the upload size limit.
pub fn build_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/upload", post(handlers::upload_batch))
        .route("/status/:task_id", get(handlers::get_status))
        .route("/results/:id", get(handlers::get_record))
        .route("/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        // Multipart would otherwise cap bodies at axum's 2 MB default.
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}
