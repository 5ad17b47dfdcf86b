// main.rs

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::{env, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, Level};
use tracing_subscriber;

// --- Local modules ---
mod s3_operations;

use s3_operations::bucket_handlers::{create_bucket, delete_bucket, get_all_buckets};
use s3_operations::object_handlers::{
    copy_object, create_folder, delete_object, list_objects, move_object, upload_object,
};
use s3_operations::store::{AwsStore, MemoryStore, ObjectStoreClient};

// --- Application State ---
pub struct AppState {
    pub store: Arc<dyn ObjectStoreClient>,
}

// --- Main Entry Point ---
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting S3 File Manager backend...");

    // Choose store implementation
    let region = env::var("AWS_REGION").unwrap_or_else(|_| "eu-north-1".to_string());
    let store: Arc<dyn ObjectStoreClient> = match env::var("STORE_BACKEND").as_deref() {
        Ok("memory") => {
            info!("Using in-memory store backend");
            Arc::new(MemoryStore::new())
        }
        _ => Arc::new(AwsStore::from_env(region).await),
    };

    let state = Arc::new(AppState { store });

    // CORS
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    // Body size limit
    let body_limit = DefaultBodyLimit::max(
        env::var("MAX_BODY_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10 * 1024 * 1024 * 1024),
    );

    // Router
    let app = Router::new()
        .route("/api/buckets", get(get_all_buckets))
        .route("/api/bucket/{bucket}", post(create_bucket).delete(delete_bucket))
        .route("/api/objects/{bucket}", get(list_objects))
        .route("/api/folder", post(create_folder))
        .route("/api/object", delete(delete_object))
        .route("/api/upload", post(upload_object))
        .route("/api/copy", post(copy_object))
        .route("/api/move", post(move_object))
        .layer(body_limit)
        .layer(cors)
        .with_state(state);

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(3000);
    let addr = format!("{}:{}", host, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind TCP listener")?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await.context("Axum server failed")?;
    Ok(())
}
