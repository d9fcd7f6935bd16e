use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage provider error: {0}")]
    Provider(String),
}

/// One entry of a prefix listing.
#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
}

/// Result of a head probe.
#[derive(Debug, Clone, Default)]
pub struct ObjectMetadata {
    pub content_type: Option<String>,
    pub content_length: i64,
    pub last_modified: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Object-storage capability the gateway is built on.
///
/// Signing calls never touch stored objects; the returned URL is redeemed
/// later by the client directly against the provider.
#[async_trait]
pub trait StorageService: Send + Sync {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError>;
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError>;
    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError>;
    async fn head_object(&self, key: &str) -> Result<ObjectMetadata, StorageError>;
    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;
    async fn ping(&self) -> Result<(), StorageError>;
}

pub struct S3StorageService {
    client: Client,
    bucket: String,
}

impl S3StorageService {
    pub fn new(client: Client, bucket: String) -> Self {
        Self { client, bucket }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn provider_error(err: impl std::error::Error) -> StorageError {
    StorageError::Provider(DisplayErrorContext(err).to_string())
}

fn presigning_config(expires_in: Duration) -> Result<PresigningConfig, StorageError> {
    PresigningConfig::expires_in(expires_in).map_err(provider_error)
}

fn to_chrono(d: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(d.secs(), d.subsec_nanos())
}

#[async_trait]
impl StorageService for S3StorageService {
    async fn presign_put(
        &self,
        key: &str,
        content_type: &str,
        expires_in: Duration,
    ) -> Result<String, StorageError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .presigned(presigning_config(expires_in)?)
            .await
            .map_err(|e| {
                tracing::error!("S3 presign put failed: key={}, error={:?}", key, e);
                provider_error(e)
            })?;

        Ok(request.uri().to_string())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config(expires_in)?)
            .await
            .map_err(|e| {
                tracing::error!("S3 presign get failed: key={}, error={:?}", key, e);
                provider_error(e)
            })?;

        Ok(request.uri().to_string())
    }

    async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let mut objects = Vec::new();
        let mut continuation_token = None;

        loop {
            let res = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token)
                .send()
                .await
                .map_err(provider_error)?;

            for object in res.contents.unwrap_or_default() {
                if let Some(key) = object.key {
                    objects.push(ObjectSummary {
                        key,
                        size: object.size.unwrap_or(0),
                        last_modified: object.last_modified.as_ref().and_then(to_chrono),
                        etag: object.e_tag,
                    });
                }
            }

            if res.is_truncated.unwrap_or(false) {
                continuation_token = res.next_continuation_token;
            } else {
                break;
            }
        }

        Ok(objects)
    }

    async fn head_object(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
        let res = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match res {
            Ok(out) => Ok(ObjectMetadata {
                content_type: out.content_type,
                content_length: out.content_length.unwrap_or(0),
                last_modified: out.last_modified.as_ref().and_then(to_chrono),
                etag: out.e_tag,
                metadata: out.metadata.unwrap_or_default(),
            }),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Err(StorageError::NotFound(key.to_string()))
                } else {
                    Err(provider_error(service_error))
                }
            }
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(provider_error)?;
        Ok(())
    }
}
