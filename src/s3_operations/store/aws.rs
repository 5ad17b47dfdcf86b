// store/aws.rs
use super::{
    BatchDeleteError, BatchDeleteResult, ListPage, ObjectStoreClient, StorageEntry, StoreError,
};
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::types::{
    BucketLocationConstraint, CreateBucketConfiguration, Delete, ObjectIdentifier,
};
use aws_sdk_s3::Client;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::info;

/// Store backend over the real S3 API via the AWS SDK. Credentials come
/// from the SDK's default provider chain (env, profile, instance role).
pub struct AwsStore {
    client: Client,
    region: String,
}

impl AwsStore {
    pub async fn from_env(region: String) -> Self {
        let region_provider =
            RegionProviderChain::first_try(Region::new(region.clone())).or_default_provider();
        let cfg = aws_config::from_env().region(region_provider).load().await;
        info!("S3 client configured for region '{}'", region);
        Self {
            client: Client::new(&cfg),
            region,
        }
    }
}

/// Dispatch and timeout failures mean we never reached the service; anything
/// else is a provider-side error surfaced verbatim.
fn map_sdk_err<E>(err: SdkError<E>) -> StoreError
where
    E: std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(&err).to_string();
    match err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => {
            StoreError::Unavailable(message)
        }
        _ => StoreError::Provider(message),
    }
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.secs(), dt.subsec_nanos())
}

#[async_trait]
impl ObjectStoreClient for AwsStore {
    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        let resp = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(resp
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_string))
            .collect())
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        let constraint = BucketLocationConstraint::from(self.region.as_str());
        let cfg = CreateBucketConfiguration::builder()
            .location_constraint(constraint)
            .build();
        self.client
            .create_bucket()
            .bucket(bucket)
            .create_bucket_configuration(cfg)
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(())
    }

    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation: Option<String>,
        max_keys: Option<i32>,
    ) -> Result<ListPage, StoreError> {
        let mut req = self.client.list_objects_v2().bucket(bucket).prefix(prefix);
        if let Some(token) = continuation {
            req = req.continuation_token(token);
        }
        if let Some(n) = max_keys {
            req = req.max_keys(n);
        }
        let resp = req.send().await.map_err(map_sdk_err)?;

        let entries = resp
            .contents()
            .iter()
            .filter_map(|obj| {
                let key = obj.key()?.to_string();
                Some(StorageEntry {
                    key,
                    size: obj.size(),
                    last_modified: obj.last_modified().and_then(to_chrono),
                })
            })
            .collect();

        Ok(ListPage {
            entries,
            next_continuation: resp.next_continuation_token().map(str::to_string),
        })
    }

    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StoreError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body.into())
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(())
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        keys: &[String],
    ) -> Result<BatchDeleteResult, StoreError> {
        let objects = keys
            .iter()
            .map(|k| ObjectIdentifier::builder().key(k).build())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::Provider(e.to_string()))?;
        let delete = Delete::builder()
            .set_objects(Some(objects))
            .quiet(false)
            .build()
            .map_err(|e| StoreError::Provider(e.to_string()))?;

        let resp = self
            .client
            .delete_objects()
            .bucket(bucket)
            .delete(delete)
            .send()
            .await
            .map_err(map_sdk_err)?;

        let deleted = resp
            .deleted()
            .iter()
            .filter_map(|d| d.key().map(str::to_string))
            .collect();
        let errors = resp
            .errors()
            .iter()
            .map(|e| BatchDeleteError {
                key: e.key().unwrap_or_default().to_string(),
                message: e.message().unwrap_or("unknown error").to_string(),
            })
            .collect();

        Ok(BatchDeleteResult { deleted, errors })
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<StorageEntry, StoreError> {
        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(out) => Ok(StorageEntry {
                key: key.to_string(),
                size: out.content_length(),
                last_modified: out.last_modified().and_then(to_chrono),
            }),
            Err(err) => {
                if err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                {
                    Err(StoreError::NotFound)
                } else {
                    Err(map_sdk_err(err))
                }
            }
        }
    }

    async fn copy_object(
        &self,
        bucket: &str,
        source_key: &str,
        dest_key: &str,
    ) -> Result<(), StoreError> {
        self.client
            .copy_object()
            .copy_source(format!("{}/{}", bucket, source_key))
            .bucket(bucket)
            .key(dest_key)
            .send()
            .await
            .map_err(map_sdk_err)?;
        Ok(())
    }
}
