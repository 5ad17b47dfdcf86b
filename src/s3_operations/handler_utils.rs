// handler_utils.rs
use crate::s3_operations::store::StoreError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Handler-level error. Every variant maps to a JSON body of the form
/// `{"error": "..."}` so callers never see a bare provider error.
#[derive(Debug)]
pub enum AppError {
    /// Malformed input (empty key, bad folder name). Rejected before any
    /// store call.
    Validation(String),
    InvalidBucketName(String),
    Store(StoreError),
    Internal(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::InvalidBucketName(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Store(StoreError::NotFound) => {
                (StatusCode::NOT_FOUND, "not found".to_string())
            }
            AppError::Store(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            AppError::Internal(e) => {
                error!("Internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::Store(e)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}

/// Keys must be non-empty and must not start with '/'.
pub fn validate_key(key: &str) -> Result<(), AppError> {
    if key.trim().is_empty() {
        return Err(AppError::Validation("Object key must not be empty".into()));
    }
    if key.starts_with('/') {
        return Err(AppError::Validation(
            "Object key must not start with '/'".into(),
        ));
    }
    Ok(())
}

/// Folder names must have at least one non-empty segment and no empty
/// interior segments (a trailing '/' is allowed and normalized away by
/// callers).
pub fn validate_folder_name(folder_name: &str) -> Result<(), AppError> {
    let trimmed = folder_name.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AppError::Validation(
            "Folder name must not be empty".into(),
        ));
    }
    if trimmed.split('/').any(|seg| seg.is_empty()) {
        return Err(AppError::Validation(format!(
            "Malformed folder name '{folder_name}': empty path segment"
        )));
    }
    Ok(())
}
