// object_handlers.rs
use axum::{
    extract::{Multipart, Path as AxumPath, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    s3_operations::{
        bucket_handlers::MessageResponse,
        deleter::{DeleteOutcome, RecursiveDeleter},
        handler_utils::{validate_folder_name, validate_key, AppError},
        hierarchy::{HierarchyBuilder, Listing},
    },
    AppState,
};

// ====================================================================
// Query parameters
// ====================================================================
#[derive(Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub prefix: String,
}

#[derive(Deserialize)]
pub struct FolderParams {
    pub bucket_name: String,
    pub folder_name: String,
}

#[derive(Deserialize)]
pub struct ObjectParams {
    pub bucket_name: String,
    pub key: String,
}

#[derive(Deserialize)]
pub struct CopyParams {
    pub bucket_name: String,
    pub source_key: String,
    pub dest_key: String,
}

#[derive(Serialize)]
pub struct CreateFolderResponse {
    pub message: String,
    pub folder_key: String,
}

#[derive(Serialize)]
pub struct MoveResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ====================================================================
// Handlers
// ====================================================================

/// GET /api/objects/{bucket}?prefix=
///
/// Always answers 200 with a `Listing`; store failures are inside the shape.
pub async fn list_objects(
    State(state): State<Arc<AppState>>,
    AxumPath(bucket): AxumPath<String>,
    Query(query): Query<ListQuery>,
) -> Json<Listing> {
    let listing = HierarchyBuilder::new(state.store.clone())
        .build(&bucket, &query.prefix)
        .await;
    Json(listing)
}

/// POST /api/folder?bucket_name=&folder_name=
///
/// Creates the zero-byte marker object that makes an empty folder visible.
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FolderParams>,
) -> Result<Json<CreateFolderResponse>, AppError> {
    validate_folder_name(&params.folder_name)?;

    let folder_key = if params.folder_name.ends_with('/') {
        params.folder_name.clone()
    } else {
        format!("{}/", params.folder_name)
    };

    state
        .store
        .put_object(&params.bucket_name, &folder_key, bytes::Bytes::new())
        .await?;
    info!(
        "CREATE Folder Bucket='{}', Key='{}'",
        params.bucket_name, folder_key
    );
    Ok(Json(CreateFolderResponse {
        message: format!(
            "Folder '{}' created successfully in '{}'.",
            folder_key, params.bucket_name
        ),
        folder_key,
    }))
}

/// DELETE /api/object?bucket_name=&key=
///
/// Files are deleted directly; folder keys (or keys with children) are
/// deleted recursively. The outcome body always carries the partial
/// progress, even when the status is 400.
pub async fn delete_object(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ObjectParams>,
) -> Result<(StatusCode, Json<DeleteOutcome>), AppError> {
    validate_key(&params.key)?;

    let outcome = RecursiveDeleter::new(state.store.clone())
        .delete(&params.bucket_name, &params.key)
        .await;
    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };
    Ok((status, Json(outcome)))
}

/// POST /api/upload?bucket_name=&key= with a multipart `file` field.
pub async fn upload_object(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ObjectParams>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, AppError> {
    validate_key(&params.key)?;

    let mut body = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
            body = Some(data);
            break;
        }
    }
    let body = body.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    info!(
        "UPLOAD Bucket='{}', Key='{}' ({} bytes)",
        params.bucket_name,
        params.key,
        body.len()
    );
    state
        .store
        .put_object(&params.bucket_name, &params.key, body)
        .await?;
    Ok(Json(MessageResponse {
        message: format!("File '{}' uploaded to '{}'.", params.key, params.bucket_name),
    }))
}

/// POST /api/copy?bucket_name=&source_key=&dest_key=
pub async fn copy_object(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CopyParams>,
) -> Result<Json<MessageResponse>, AppError> {
    validate_key(&params.source_key)?;
    validate_key(&params.dest_key)?;

    state
        .store
        .copy_object(&params.bucket_name, &params.source_key, &params.dest_key)
        .await?;
    info!(
        "COPY Bucket='{}', '{}' -> '{}'",
        params.bucket_name, params.source_key, params.dest_key
    );
    Ok(Json(MessageResponse {
        message: format!(
            "Copied '{}' to '{}' in bucket '{}'.",
            params.source_key, params.dest_key, params.bucket_name
        ),
    }))
}

/// POST /api/move?bucket_name=&source_key=&dest_key=
///
/// Copy then delete-source. Not atomic: when the delete fails after the
/// copy succeeded, the destination copy remains and the response says so.
pub async fn move_object(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CopyParams>,
) -> Result<(StatusCode, Json<MoveResponse>), AppError> {
    validate_key(&params.source_key)?;
    validate_key(&params.dest_key)?;

    state
        .store
        .copy_object(&params.bucket_name, &params.source_key, &params.dest_key)
        .await?;

    let outcome = RecursiveDeleter::new(state.store.clone())
        .delete(&params.bucket_name, &params.source_key)
        .await;

    if outcome.success {
        info!(
            "MOVE Bucket='{}', '{}' -> '{}'",
            params.bucket_name, params.source_key, params.dest_key
        );
        Ok((
            StatusCode::OK,
            Json(MoveResponse {
                success: true,
                message: Some(format!(
                    "Moved '{}' to '{}' in bucket '{}'.",
                    params.source_key, params.dest_key, params.bucket_name
                )),
                error: None,
            }),
        ))
    } else {
        warn!(
            "MOVE Bucket='{}', '{}' -> '{}': source delete failed, destination copy remains",
            params.bucket_name, params.source_key, params.dest_key
        );
        Ok((
            StatusCode::BAD_REQUEST,
            Json(MoveResponse {
                success: false,
                message: None,
                error: Some(format!(
                    "Copied '{}' to '{}' but failed to delete the source: {}. \
                     The destination copy remains.",
                    params.source_key,
                    params.dest_key,
                    outcome.error.as_deref().unwrap_or("unknown error")
                )),
            }),
        ))
    }
}
