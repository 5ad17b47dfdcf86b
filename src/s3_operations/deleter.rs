// deleter.rs
//
// Recursive deletion over a prefix namespace. A key names a folder when it
// ends with '/' or when a probe listing under "<key>/" returns anything;
// otherwise it is a single object. Folder deletion pages through every key
// under the prefix, adds the marker object when one exists, and deletes in
// provider-bounded batches, sequentially, failing fast on the first batch
// that reports per-key errors while still reporting what was deleted.

use crate::s3_operations::store::{list_all, ObjectStoreClient, StoreError};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// S3 caps DeleteObjects at 1000 keys per call.
pub const MAX_BATCH_DELETE: usize = 1_000;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct FailedKey {
    pub key: String,
    pub message: String,
}

/// Result shape for a delete request. Partial progress is always visible:
/// `deleted_objects` holds every key the store confirmed even when the
/// operation as a whole failed.
#[derive(Serialize, Debug)]
pub struct DeleteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub deleted_objects: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_objects: Option<Vec<FailedKey>>,
}

impl DeleteOutcome {
    fn succeeded(message: String, deleted_objects: Vec<String>) -> Self {
        Self {
            success: true,
            message: Some(message),
            error: None,
            deleted_objects,
            failed_objects: None,
        }
    }

    fn failed(error: String, deleted_objects: Vec<String>) -> Self {
        Self {
            success: false,
            message: None,
            error: Some(error),
            deleted_objects,
            failed_objects: None,
        }
    }
}

pub struct RecursiveDeleter {
    store: Arc<dyn ObjectStoreClient>,
    batch_size: usize,
}

impl RecursiveDeleter {
    pub fn new(store: Arc<dyn ObjectStoreClient>) -> Self {
        Self {
            store,
            batch_size: MAX_BATCH_DELETE,
        }
    }

    #[cfg(test)]
    fn with_batch_size(store: Arc<dyn ObjectStoreClient>, batch_size: usize) -> Self {
        Self { store, batch_size }
    }

    /// Deletes `key`, recursively when it names a folder.
    pub async fn delete(&self, bucket: &str, key: &str) -> DeleteOutcome {
        if key.ends_with('/') || self.has_children(bucket, key).await {
            self.delete_folder(bucket, key).await
        } else {
            match self.store.delete_object(bucket, key).await {
                Ok(()) => {
                    info!("DELETE Bucket='{}', Key='{}': file deleted", bucket, key);
                    DeleteOutcome::succeeded(
                        format!("File '{key}' deleted from '{bucket}'."),
                        vec![key.to_string()],
                    )
                }
                Err(e) => {
                    error!("DELETE Bucket='{}', Key='{}' failed: {}", bucket, key, e);
                    DeleteOutcome::failed(format!("Failed to delete '{key}': {e}"), Vec::new())
                }
            }
        }
    }

    /// Existence probe: does anything live under "<key>/"? This is a
    /// required side-effecting lookup that selects the folder branch, not
    /// an optimization.
    async fn has_children(&self, bucket: &str, key: &str) -> bool {
        let prefix = format!("{}/", key.trim_end_matches('/'));
        match self
            .store
            .list_page(bucket, &prefix, None, Some(1))
            .await
        {
            Ok(page) => !page.entries.is_empty(),
            Err(_) => false,
        }
    }

    async fn delete_folder(&self, bucket: &str, key: &str) -> DeleteOutcome {
        let folder_key = if key.ends_with('/') {
            key.to_string()
        } else {
            format!("{key}/")
        };

        let mut targets: Vec<String> =
            match list_all(self.store.as_ref(), bucket, &folder_key).await {
                Ok(entries) => entries.into_iter().map(|e| e.key).collect(),
                Err(e) => {
                    error!(
                        "DELETE Bucket='{}', Prefix='{}': listing failed: {}",
                        bucket, folder_key, e
                    );
                    return DeleteOutcome::failed(
                        format!("Failed to delete folder '{folder_key}': {e}"),
                        Vec::new(),
                    );
                }
            };

        // The marker may exist without children; NotFound just means there
        // is no marker, anything else is fatal for the whole operation.
        match self.store.head_object(bucket, &folder_key).await {
            Ok(_) => {
                if !targets.contains(&folder_key) {
                    targets.push(folder_key.clone());
                }
            }
            Err(StoreError::NotFound) => {}
            Err(e) => {
                error!(
                    "DELETE Bucket='{}', Key='{}': marker probe failed: {}",
                    bucket, folder_key, e
                );
                return DeleteOutcome::failed(
                    format!("Failed to delete folder '{folder_key}': {e}"),
                    Vec::new(),
                );
            }
        }

        if targets.is_empty() {
            info!(
                "DELETE Bucket='{}', Key='{}': nothing to delete",
                bucket, folder_key
            );
            return DeleteOutcome::succeeded(
                format!("Folder '{folder_key}' is already empty or doesn't exist."),
                Vec::new(),
            );
        }

        let mut deleted: Vec<String> = Vec::with_capacity(targets.len());
        for batch in targets.chunks(self.batch_size) {
            match self.store.delete_objects(bucket, batch).await {
                Ok(result) => {
                    deleted.extend(result.deleted);
                    if !result.errors.is_empty() {
                        let failed: Vec<FailedKey> = result
                            .errors
                            .into_iter()
                            .map(|e| FailedKey {
                                key: e.key,
                                message: e.message,
                            })
                            .collect();
                        let summary = failed
                            .iter()
                            .map(|f| format!("{}: {}", f.key, f.message))
                            .collect::<Vec<_>>()
                            .join("; ");
                        warn!(
                            "DELETE Bucket='{}', Key='{}': {} of {} keys failed",
                            bucket,
                            folder_key,
                            failed.len(),
                            batch.len()
                        );
                        return DeleteOutcome {
                            success: false,
                            message: None,
                            error: Some(format!("Some objects couldn't be deleted: {summary}")),
                            deleted_objects: deleted,
                            failed_objects: Some(failed),
                        };
                    }
                }
                Err(e) => {
                    error!(
                        "DELETE Bucket='{}', Key='{}': batch delete failed: {}",
                        bucket, folder_key, e
                    );
                    return DeleteOutcome::failed(
                        format!("Failed to delete folder '{folder_key}': {e}"),
                        deleted,
                    );
                }
            }
        }

        info!(
            "DELETE Bucket='{}', Key='{}': {} objects deleted",
            bucket,
            folder_key,
            deleted.len()
        );
        DeleteOutcome::succeeded(
            format!(
                "Folder '{folder_key}' and all its contents ({} objects) deleted successfully.",
                deleted.len()
            ),
            deleted,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::s3_operations::store::MemoryStore;
    use bytes::Bytes;

    async fn seeded(bucket: &str, keys: &[&str]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.create_bucket(bucket).await.unwrap();
        for key in keys {
            store
                .put_object(bucket, key, Bytes::new())
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn recursive_delete_takes_files_and_marker() {
        let store = seeded("docs", &["a/b/x.txt", "a/b/c/y.txt", "a/b/", "a/other.txt"]).await;
        let outcome = RecursiveDeleter::new(store.clone())
            .delete("docs", "a/b/")
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.deleted_objects.len(), 3);
        assert!(!store.contains("docs", "a/b/x.txt").await);
        assert!(!store.contains("docs", "a/b/c/y.txt").await);
        assert!(!store.contains("docs", "a/b/").await);
        // Sibling outside the prefix is untouched.
        assert!(store.contains("docs", "a/other.txt").await);
    }

    #[tokio::test]
    async fn key_without_slash_is_classified_by_probe() {
        let store = seeded("docs", &["a/b/x.txt"]).await;
        let outcome = RecursiveDeleter::new(store.clone())
            .delete("docs", "a/b")
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.deleted_objects, vec!["a/b/x.txt".to_string()]);
        assert!(!store.contains("docs", "a/b/x.txt").await);
    }

    #[tokio::test]
    async fn deleting_absent_folder_is_idempotent() {
        let store = seeded("docs", &[]).await;
        let outcome = RecursiveDeleter::new(store).delete("docs", "ghost/").await;

        assert!(outcome.success);
        assert!(outcome.deleted_objects.is_empty());
        assert!(outcome.message.is_some());
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn file_branch_deletes_exactly_one_key() {
        let store = seeded("docs", &["solo.txt"]).await;
        let outcome = RecursiveDeleter::new(store.clone())
            .delete("docs", "solo.txt")
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.deleted_objects, vec!["solo.txt".to_string()]);
        assert!(!store.contains("docs", "solo.txt").await);
    }

    #[tokio::test]
    async fn file_branch_failure_reports_empty_deleted_list() {
        let store = seeded("docs", &["stuck.txt"]).await;
        store.inject_delete_failure("stuck.txt").await;

        let outcome = RecursiveDeleter::new(store.clone())
            .delete("docs", "stuck.txt")
            .await;

        assert!(!outcome.success);
        assert!(outcome.deleted_objects.is_empty());
        assert!(outcome.error.is_some());
        assert!(store.contains("docs", "stuck.txt").await);
    }

    #[tokio::test]
    async fn partial_batch_failure_reports_both_lists() {
        let keys = ["f/1.txt", "f/2.txt", "f/3.txt", "f/4.txt", "f/5.txt"];
        let store = seeded("docs", &keys).await;
        store.inject_delete_failure("f/3.txt").await;

        let outcome = RecursiveDeleter::new(store.clone())
            .delete("docs", "f/")
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.deleted_objects.len(), 4);
        assert!(!outcome.deleted_objects.contains(&"f/3.txt".to_string()));

        let failed = outcome.failed_objects.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].key, "f/3.txt");
        assert!(!failed[0].message.is_empty());
        assert!(store.contains("docs", "f/3.txt").await);
    }

    #[tokio::test]
    async fn batches_are_partitioned_and_issued_in_order() {
        let keys = ["g/1", "g/2", "g/3", "g/4", "g/5"];
        let store = seeded("docs", &keys).await;

        let outcome = RecursiveDeleter::with_batch_size(store.clone(), 2)
            .delete("docs", "g/")
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.deleted_objects.len(), 5);
        for key in keys {
            assert!(!store.contains("docs", key).await);
        }
    }

    #[tokio::test]
    async fn failing_batch_stops_further_batches() {
        let keys = ["h/1", "h/2", "h/3", "h/4"];
        let store = seeded("docs", &keys).await;
        store.inject_delete_failure("h/1").await;

        let outcome = RecursiveDeleter::with_batch_size(store.clone(), 2)
            .delete("docs", "h/")
            .await;

        assert!(!outcome.success);
        // First batch: h/1 fails, h/2 deleted. Later batches never issued.
        assert_eq!(outcome.deleted_objects, vec!["h/2".to_string()]);
        assert!(store.contains("docs", "h/3").await);
        assert!(store.contains("docs", "h/4").await);
    }

    #[tokio::test]
    async fn marker_only_folder_is_deleted() {
        let store = seeded("docs", &["empty/"]).await;
        let outcome = RecursiveDeleter::new(store.clone())
            .delete("docs", "empty/")
            .await;

        assert!(outcome.success);
        assert_eq!(outcome.deleted_objects, vec!["empty/".to_string()]);
        assert!(!store.contains("docs", "empty/").await);
    }
}
