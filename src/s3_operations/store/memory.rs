// store/memory.rs
use super::{
    BatchDeleteError, BatchDeleteResult, ListPage, ObjectStoreClient, StorageEntry, StoreError,
};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

const DEFAULT_PAGE_SIZE: usize = 1_000;

#[derive(Clone)]
struct StoredObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

/// In-process store backend: buckets as lexicographically ordered key maps,
/// matching S3 listing order. Used as the local-dev backend and as the test
/// double behind the hierarchy and delete logic.
///
/// `failing_deletes` lets tests make individual keys refuse deletion, so
/// partial batch failures can be exercised without a real provider.
#[derive(Default)]
pub struct MemoryStore {
    buckets: RwLock<BTreeMap<String, BTreeMap<String, StoredObject>>>,
    failing_deletes: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn inject_delete_failure(&self, key: &str) {
        self.failing_deletes.write().await.insert(key.to_string());
    }

    #[cfg(test)]
    pub async fn contains(&self, bucket: &str, key: &str) -> bool {
        self.buckets
            .read()
            .await
            .get(bucket)
            .map(|objects| objects.contains_key(key))
            .unwrap_or(false)
    }
}

#[async_trait]
impl ObjectStoreClient for MemoryStore {
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.buckets.read().await.keys().cloned().collect())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().await;
        if buckets.contains_key(bucket) {
            return Err(StoreError::Provider(format!(
                "bucket '{bucket}' already exists"
            )));
        }
        buckets.insert(bucket.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().await;
        match buckets.get(bucket) {
            None => Err(StoreError::NotFound),
            Some(objects) if !objects.is_empty() => Err(StoreError::Provider(format!(
                "bucket '{bucket}' is not empty"
            ))),
            Some(_) => {
                buckets.remove(bucket);
                Ok(())
            }
        }
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
        max_keys: Option<i32>,
    ) -> Result<ListPage, StoreError> {
        let buckets = self.buckets.read().await;
        let objects = buckets.get(bucket).ok_or(StoreError::NotFound)?;

        let limit = max_keys
            .map(|n| n.max(0) as usize)
            .unwrap_or(DEFAULT_PAGE_SIZE);
        let mut matched = objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .filter(|(k, _)| continuation.as_deref().map_or(true, |t| k.as_str() > t));

        let mut entries = Vec::new();
        for (key, obj) in matched.by_ref().take(limit) {
            entries.push(StorageEntry {
                key: key.clone(),
                size: Some(obj.data.len() as i64),
                last_modified: Some(obj.last_modified),
            });
        }
        let next_continuation = if matched.next().is_some() {
            entries.last().map(|e| e.key.clone())
        } else {
            None
        };

        Ok(ListPage {
            entries,
            next_continuation,
        })
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets.get_mut(bucket).ok_or(StoreError::NotFound)?;
        objects.insert(
            key.to_string(),
            StoredObject {
                data: body,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        if self.failing_deletes.read().await.contains(key) {
            return Err(StoreError::Provider(format!(
                "delete rejected for '{key}'"
            )));
        }
        let mut buckets = self.buckets.write().await;
        let objects = buckets.get_mut(bucket).ok_or(StoreError::NotFound)?;
        // S3 semantics: deleting an absent key succeeds.
        objects.remove(key);
        Ok(())
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<BatchDeleteResult, StoreError> {
        let failing = self.failing_deletes.read().await;
        let mut buckets = self.buckets.write().await;
        let objects = buckets.get_mut(bucket).ok_or(StoreError::NotFound)?;

        let mut result = BatchDeleteResult::default();
        for key in keys {
            if failing.contains(key) {
                result.errors.push(BatchDeleteError {
                    key: key.clone(),
                    message: format!("delete rejected for '{key}'"),
                });
            } else {
                objects.remove(key);
                result.deleted.push(key.clone());
            }
        }
        Ok(result)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<StorageEntry, StoreError> {
        let buckets = self.buckets.read().await;
        let objects = buckets.get(bucket).ok_or(StoreError::NotFound)?;
        let obj = objects.get(key).ok_or(StoreError::NotFound)?;
        Ok(StorageEntry {
            key: key.to_string(),
            size: Some(obj.data.len() as i64),
            last_modified: Some(obj.last_modified),
        })
    }

    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write().await;
        let objects = buckets.get_mut(bucket).ok_or(StoreError::NotFound)?;
        let source = objects.get(source_key).ok_or(StoreError::NotFound)?.clone();
        objects.insert(
            dest_key.to_string(),
            StoredObject {
                data: source.data,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn listing_pages_resume_at_the_continuation_token() {
        let store = MemoryStore::new();
        store.create_bucket("b").await.unwrap();
        for key in ["p/1", "p/2", "p/3", "p/4", "p/5", "q/other"] {
            store.put_object("b", key, Bytes::new()).await.unwrap();
        }

        let mut seen = Vec::new();
        let mut continuation = None;
        loop {
            let page = store
                .list_page("b", "p/", continuation.take(), Some(2))
                .await
                .unwrap();
            assert!(page.entries.len() <= 2);
            seen.extend(page.entries.into_iter().map(|e| e.key));
            match page.next_continuation {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        assert_eq!(seen, vec!["p/1", "p/2", "p/3", "p/4", "p/5"]);
    }

    #[tokio::test]
    async fn head_distinguishes_absence_from_presence() {
        let store = MemoryStore::new();
        store.create_bucket("b").await.unwrap();
        store
            .put_object("b", "here.txt", Bytes::from_static(b"x"))
            .await
            .unwrap();

        assert!(store.head_object("b", "here.txt").await.is_ok());
        assert!(matches!(
            store.head_object("b", "gone.txt").await,
            Err(StoreError::NotFound)
        ));
    }
}
