// bucket_handlers.rs
use axum::{
    extract::{Path as AxumPath, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::{s3_operations::handler_utils::AppError, AppState};

#[derive(Serialize)]
pub struct BucketListResponse {
    pub buckets: Vec<String>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ====================================================================
// Validation
// ====================================================================
fn validate_bucket_name(bucket: &str) -> Result<(), AppError> {
    let len = bucket.len();
    if !(3..=63).contains(&len) {
        return Err(AppError::InvalidBucketName(format!(
            "Bucket name must be between 3 and 63 characters, got {len}"
        )));
    }

    if !bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(AppError::InvalidBucketName(
            "Only lowercase letters, numbers, hyphens, and periods allowed".into(),
        ));
    }

    if bucket.starts_with('.') || bucket.ends_with('.') || bucket.starts_with('-') || bucket.ends_with('-') {
        return Err(AppError::InvalidBucketName(
            "Cannot start or end with '.' or '-'".into(),
        ));
    }

    Ok(())
}

// ====================================================================
// Handlers
// ====================================================================
pub async fn get_all_buckets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BucketListResponse>, AppError> {
    let buckets = state.store.list_buckets().await?;
    info!("LIST Buckets: {} found", buckets.len());
    Ok(Json(BucketListResponse { buckets }))
}

pub async fn create_bucket(
    State(state): State<Arc<AppState>>,
    AxumPath(bucket): AxumPath<String>,
) -> Result<Json<MessageResponse>, AppError> {
    validate_bucket_name(&bucket)?;
    state.store.create_bucket(&bucket).await?;
    info!("CREATE Bucket='{}'", bucket);
    Ok(Json(MessageResponse {
        message: format!("Bucket '{bucket}' created successfully."),
    }))
}

pub async fn delete_bucket(
    State(state): State<Arc<AppState>>,
    AxumPath(bucket): AxumPath<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.store.delete_bucket(&bucket).await?;
    info!("DELETE Bucket='{}'", bucket);
    Ok(Json(MessageResponse {
        message: format!("Bucket '{bucket}' deleted successfully."),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_name_rules() {
        assert!(validate_bucket_name("my-bucket").is_ok());
        assert!(validate_bucket_name("ab").is_err());
        assert!(validate_bucket_name("UPPER").is_err());
        assert!(validate_bucket_name("-leading").is_err());
        assert!(validate_bucket_name("trailing.").is_err());
        assert!(validate_bucket_name("has_underscore").is_err());
    }
}
