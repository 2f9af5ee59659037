//! HTTP error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    Internal(pagemeta_core::Error),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<pagemeta_core::Error> for ApiError {
    fn from(err: pagemeta_core::Error) -> Self {
        match err {
            pagemeta_core::Error::NotFound(msg) => ApiError::NotFound(msg),
            pagemeta_core::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            pagemeta_core::Error::Conflict(msg) => ApiError::Conflict(msg),
            pagemeta_core::Error::DuplicateUrl(url) => {
                ApiError::Conflict(format!("Duplicate url: {url}"))
            }
            other => ApiError::Internal(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Internal(err) => {
                error!(subsystem = "api", error = %err, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
