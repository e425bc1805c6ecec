use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Identity-provider failures: bad credentials, rejected federated
    /// credential, provider network errors.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Disallowed operation in the current session state,
    /// e.g. a profile update on an anonymous session.
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Object-storage failure while uploading a profile photo.
    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Access denied")]
    AccessDenied,

    /// Backend-as-a-service call failed. Only surfaced where sync is not
    /// best-effort, e.g. direct record lookups.
    #[error("Record store error: {0}")]
    RecordStore(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Auth(msg) => (StatusCode::UNAUTHORIZED, "AUTH_ERROR", msg.clone()),
            AppError::Precondition(msg) => {
                (StatusCode::CONFLICT, "PRECONDITION_FAILED", msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Upload(msg) => {
                tracing::error!("Upload error: {msg}");
                (StatusCode::BAD_GATEWAY, "UPLOAD_ERROR", msg.clone())
            }
            AppError::AccessDenied => (
                StatusCode::FORBIDDEN,
                "ACCESS_DENIED",
                "You do not have permission to access this resource".to_string(),
            ),
            AppError::RecordStore(msg) => {
                tracing::error!("Record store error: {msg}");
                (StatusCode::BAD_GATEWAY, "RECORD_STORE_ERROR", msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
