//! Webhook error types.
//!
//! [`ApiError`] is what the HTTP boundary answers with; [`WebhookError`] covers
//! the notification worker, whose failures are only ever logged.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use threadcard_core::ThreadcardError;
use threadcard_store::StoreError;

/// JSON error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code, e.g. "bad_request".
    pub error: String,
    pub message: String,
}

/// HTTP-facing error of the inbound endpoint.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request: the body is not a JSON document.
    BadRequest(String),
    /// 503 Service Unavailable: the notification worker is gone.
    ServiceUnavailable(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", msg)
            }
        };
        let body = ErrorBody {
            error: error_code.to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Failure while turning a record event into a chat notification.
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("record store error: {0}")]
    Store(#[from] StoreError),

    #[error("channel configuration error: {0}")]
    Config(#[from] ThreadcardError),

    #[error("chat delivery failed: {0}")]
    Notify(String),

    #[error("invalid channel link pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl From<WebhookError> for ThreadcardError {
    fn from(err: WebhookError) -> Self {
        ThreadcardError::Webhook(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_status_codes() {
        let resp = ApiError::BadRequest("x".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let resp = ApiError::ServiceUnavailable("x".into()).into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_webhook_error_display() {
        let err = WebhookError::Notify("HTTP 403".to_string());
        assert_eq!(err.to_string(), "chat delivery failed: HTTP 403");
        let top: ThreadcardError = err.into();
        assert!(matches!(top, ThreadcardError::Webhook(_)));
    }
}
