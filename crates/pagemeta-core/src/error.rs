//! Error types for pagemeta.

use thiserror::Error;

/// Result type alias using pagemeta's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for pagemeta operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A metadata record for this URL already exists (unique index on url)
    #[error("Duplicate url: {0}")]
    DuplicateUrl(String),

    /// Resource already exists or is in use
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Batch file could not be read or has the wrong shape
    #[error("Batch file error: {0}")]
    BatchFile(String),

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("metadata record 7".to_string());
        assert_eq!(err.to_string(), "Not found: metadata record 7");
    }

    #[test]
    fn test_error_display_duplicate_url() {
        let err = Error::DuplicateUrl("https://example.com".to_string());
        assert_eq!(err.to_string(), "Duplicate url: https://example.com");
    }

    #[test]
    fn test_error_display_batch_file() {
        let err = Error::BatchFile("missing URL column".to_string());
        assert_eq!(err.to_string(), "Batch file error: missing URL column");
    }

    #[test]
    fn test_error_display_job() {
        let err = Error::Job("worker gone".to_string());
        assert_eq!(err.to_string(), "Job error: worker gone");
    }

    #[test]
    fn test_error_display_config() {
        let err = Error::Config("bad DATABASE_URL".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad DATABASE_URL");
    }

    #[test]
    fn test_error_display_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::Io(io_err);
        assert!(err.to_string().contains("I/O error:"));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
