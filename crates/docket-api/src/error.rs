//! HTTP error response conversion
//!
//! Handlers return `Result<impl IntoResponse, HttpAppError>`. Anything that converts
//! into `AppError` (including `SubmitError`) renders with the same status, body and
//! log level.
//!
//! Error details are left out of response bodies in production. The mode is fixed once
//! per process from `Config` by [`init_production_mode`].

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docket_core::{AppError, ErrorMetadata, LogLevel};
use docket_worker::SubmitError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::OnceLock;

static PRODUCTION_MODE: OnceLock<bool> = OnceLock::new();

/// Record whether this process runs in production. The first call wins; a later call
/// with a different value is logged and ignored.
pub fn init_production_mode(is_production: bool) {
    let current = *PRODUCTION_MODE.get_or_init(|| is_production);
    if current != is_production {
        tracing::warn!(
            requested = is_production,
            current,
            "Production mode already initialized; keeping the first value"
        );
    }
}

fn is_production() -> bool {
    PRODUCTION_MODE.get().copied().unwrap_or(false)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client (e.g., "Wait a few seconds and retry")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
}

impl ErrorResponse {
    fn from_app_error(app_error: &AppError, with_details: bool) -> Self {
        Self {
            error: app_error.client_message(),
            details: with_details.then(|| app_error.to_string()),
            error_type: with_details.then(|| app_error.error_type().to_string()),
            code: app_error.error_code().to_string(),
            recoverable: app_error.is_recoverable(),
            suggested_action: app_error.suggested_action().map(String::from),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// (orphan rule: IntoResponse and AppError both live in other crates)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<SubmitError> for HttpAppError {
    fn from(err: SubmitError) -> Self {
        HttpAppError(err.into())
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        let body_text = rejection.body_text();
        let message = if body_text.contains("invalid type") && body_text.contains("document_ids")
        {
            "Invalid request body: document_ids must be a list of integer ids.".to_string()
        } else {
            format!("Invalid request body: {}", body_text)
        };
        HttpAppError(AppError::InvalidInput(message))
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on
/// deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        log_error(app_error);

        let body = ErrorResponse::from_app_error(app_error, !is_production());

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_submit_error_too_many_documents() {
        let HttpAppError(app_err) = SubmitError::TooManyDocuments { count: 51, max: 50 }.into();
        match app_err {
            AppError::BatchTooLarge { count, max } => assert_eq!((count, max), (51, 50)),
            _ => panic!("Expected BatchTooLarge variant"),
        }
    }

    #[test]
    fn test_from_submit_error_empty_batch() {
        let HttpAppError(app_err) = SubmitError::EmptyBatch.into();
        match app_err {
            AppError::InvalidInput(msg) => assert!(msg.contains("document_ids")),
            _ => panic!("Expected InvalidInput variant"),
        }
    }

    #[test]
    fn test_from_submit_error_queue_closed() {
        let HttpAppError(app_err) = SubmitError::QueueClosed.into();
        assert_eq!(app_err.http_status_code(), 503);
        assert!(app_err.is_recoverable());
    }

    #[test]
    fn test_from_submit_error_duplicate_task() {
        let HttpAppError(app_err) = SubmitError::DuplicateTask("t-1".to_string()).into();
        assert_eq!(app_err.http_status_code(), 409);
        assert_eq!(app_err.error_code(), "CONFLICT");
    }

    /// Verifies the public error response contract: serialized ErrorResponse has "error",
    /// "code", "recoverable", and optionally "details" / "error_type" / "suggested_action".
    #[test]
    fn test_error_response_shape() {
        let app_err = AppError::NotFound("Task not found".to_string());
        let json = serde_json::to_value(ErrorResponse::from_app_error(&app_err, true))
            .expect("serialize");
        assert_eq!(json.get("error").and_then(|v| v.as_str()), Some("Task not found"));
        assert_eq!(json.get("code").and_then(|v| v.as_str()), Some("NOT_FOUND"));
        assert_eq!(json.get("recoverable").and_then(|v| v.as_bool()), Some(false));
        assert_eq!(json.get("error_type").and_then(|v| v.as_str()), Some("NotFound"));
        assert!(json.get("suggested_action").is_some());

        let json = serde_json::to_value(ErrorResponse::from_app_error(&app_err, false))
            .expect("serialize");
        assert!(json.get("details").is_none());
        assert!(json.get("error_type").is_none());
    }
}
