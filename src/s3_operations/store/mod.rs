// store/mod.rs
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Raw entry from a bucket listing. `size` is carried as reported by the
/// provider; folder markers are distinguished by their trailing `/`, not by
/// their size.
#[derive(Clone, Debug, PartialEq)]
pub struct StorageEntry {
    pub key: String,
    pub size: Option<i64>,
    pub last_modified: Option<DateTime<Utc>>,
}

/// One page of a prefix listing. `next_continuation` is `Some` while more
/// pages remain.
#[derive(Clone, Debug, Default)]
pub struct ListPage {
    pub entries: Vec<StorageEntry>,
    pub next_continuation: Option<String>,
}

/// Per-key failure inside a batch delete.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchDeleteError {
    pub key: String,
    pub message: String,
}

/// Outcome of a batch delete: keys the provider confirmed deleted, plus
/// per-key failures. Both lists are meaningful at once.
#[derive(Clone, Debug, Default)]
pub struct BatchDeleteResult {
    pub deleted: Vec<String>,
    pub errors: Vec<BatchDeleteError>,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Connectivity or credential failure reaching the provider.
    #[error("object store unavailable: {0}")]
    Unavailable(String),
    /// Bucket or key does not exist. Distinguished so callers can treat
    /// "marker doesn't exist" differently from real faults.
    #[error("not found")]
    NotFound,
    /// Any other provider-side error, message surfaced verbatim.
    #[error("{0}")]
    Provider(String),
}

// ──────────────────────────────────────────────────────
// ObjectStoreClient trait
// ──────────────────────────────────────────────────────
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError>;

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    /// One page of keys starting with `prefix`. Pass the previous page's
    /// `next_continuation` to resume; `max_keys` caps the page size.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
        max_keys: Option<i32>,
    ) -> Result<ListPage, StoreError>;

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Batch delete. The slice must respect the provider's per-call limit;
    /// callers partition before invoking this.
    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<BatchDeleteResult, StoreError>;

    /// Metadata for exactly `key`. `StoreError::NotFound` signals absence.
    async fn head_object(&self, bucket: &str, key: &str) -> Result<StorageEntry, StoreError>;

    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StoreError>;
}

/// Drives `list_page` to exhaustion and collects every entry under `prefix`.
/// No client-side cap on the number of pages.
pub async fn list_all(
    store: &dyn ObjectStoreClient,
    bucket: &str,
    prefix: &str,
) -> Result<Vec<StorageEntry>, StoreError> {
    let mut entries = Vec::new();
    let mut continuation: Option<String> = None;
    loop {
        let page = store
            .list_page(bucket, prefix, continuation.take(), None)
            .await?;
        entries.extend(page.entries);
        match page.next_continuation {
            Some(token) => continuation = Some(token),
            None => break,
        }
    }
    Ok(entries)
}

// Re-export implementations
pub use aws::AwsStore;
pub use memory::MemoryStore;

mod aws;
mod memory;
