//! Error types module
//!
//! All errors surfaced to the HTTP layer are unified under the `AppError` enum.
//! Each variant self-describes its HTTP status, machine-readable code and log level
//! through [`ErrorMetadata`].

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like a closed queue
    Warn,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "BATCH_SIZE_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Batch too large: {count} documents exceeds maximum of {max}")]
    BatchTooLarge { count: usize, max: usize },

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (u16, &'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            LogLevel::Debug,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            false,
            Some("Use a different identifier"),
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check authentication token"),
            LogLevel::Debug,
        ),
        AppError::BatchTooLarge { .. } => (
            400,
            "BATCH_SIZE_EXCEEDED",
            false,
            Some("Split the batch into smaller requests"),
            LogLevel::Debug,
        ),
        AppError::ServiceUnavailable(_) => (
            503,
            "SERVICE_UNAVAILABLE",
            true,
            Some("Wait a few seconds and retry"),
            LogLevel::Warn,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::BatchTooLarge { .. } => "BatchTooLarge",
            AppError::ServiceUnavailable(_) => "ServiceUnavailable",
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).4
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::BatchTooLarge { count, max } => format!(
                "Batch contains {} documents, maximum allowed is {}",
                count, max
            ),
            AppError::ServiceUnavailable(ref msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("Task not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Task not found");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_batch_too_large() {
        let err = AppError::BatchTooLarge { count: 51, max: 50 };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "BATCH_SIZE_EXCEEDED");
        assert!(err.client_message().contains("51"));
        assert!(err.client_message().contains("50"));
    }

    #[test]
    fn test_error_metadata_service_unavailable() {
        let err = AppError::ServiceUnavailable("Task queue is closed".to_string());
        assert_eq!(err.http_status_code(), 503);
        assert_eq!(err.error_code(), "SERVICE_UNAVAILABLE");
        assert!(err.is_recoverable());
        assert_eq!(err.log_level(), LogLevel::Warn);
        assert_eq!(err.error_type(), "ServiceUnavailable");
    }

    #[test]
    fn test_unauthorized_message_is_passed_through() {
        let err = AppError::Unauthorized("Missing user identity".to_string());
        assert_eq!(err.http_status_code(), 401);
        assert_eq!(err.client_message(), "Missing user identity");
        assert_eq!(err.to_string(), "Unauthorized: Missing user identity");
    }
}
