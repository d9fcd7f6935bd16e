use crate::api::error::AppError;
use crate::models::FileRecord;
use crate::services::keys::parse_key;
use crate::services::storage::{ObjectMetadata, ObjectSummary, StorageService};
use std::sync::Arc;
use std::time::Duration;

/// Capability issuance and existence-checked operations over storage keys.
///
/// Keys are built by the caller (see `services::keys`); this service never
/// invents or rewrites them.
pub struct FileService {
    storage: Arc<dyn StorageService>,
}

impl FileService {
    pub fn new(storage: Arc<dyn StorageService>) -> Self {
        Self { storage }
    }

    /// Signs a PUT URL for `key`. Does not look at storage.
    pub async fn issue_upload_url(
        &self,
        key: &str,
        content_type: &str,
        ttl_secs: u64,
    ) -> Result<String, AppError> {
        let url = self
            .storage
            .presign_put(key, content_type, Duration::from_secs(ttl_secs))
            .await?;
        tracing::info!("🔑 Issued upload URL for {} (ttl={}s)", key, ttl_secs);
        Ok(url)
    }

    /// Signs a GET URL for `key`. Callers go through `download_url` unless
    /// existence was already established.
    pub async fn issue_download_url(&self, key: &str, ttl_secs: u64) -> Result<String, AppError> {
        let url = self
            .storage
            .presign_get(key, Duration::from_secs(ttl_secs))
            .await?;
        tracing::info!("🔑 Issued download URL for {} (ttl={}s)", key, ttl_secs);
        Ok(url)
    }

    /// Head probe. Absence becomes `AppError::NotFound("File not found")`.
    pub async fn ensure_exists(&self, key: &str) -> Result<ObjectMetadata, AppError> {
        self.storage.head_object(key).await.map_err(|e| {
            tracing::debug!("Existence check failed for {}: {}", key, e);
            AppError::from(e)
        })
    }

    pub async fn download_url(&self, key: &str, ttl_secs: u64) -> Result<String, AppError> {
        self.ensure_exists(key).await?;
        self.issue_download_url(key, ttl_secs).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.ensure_exists(key).await?;
        self.storage.delete_object(key).await?;
        tracing::info!("🗑️  Deleted {}", key);
        Ok(())
    }

    pub async fn metadata(&self, key: &str) -> Result<ObjectMetadata, AppError> {
        self.ensure_exists(key).await
    }

    /// Lists every prefix in order and concatenates the results. No global
    /// sort is applied.
    pub async fn list_under(&self, prefixes: &[String]) -> Result<Vec<FileRecord>, AppError> {
        let mut records = Vec::new();
        for prefix in prefixes {
            let objects = self.storage.list_objects(prefix).await?;
            records.extend(objects.into_iter().map(to_record));
        }
        Ok(records)
    }
}

fn to_record(object: ObjectSummary) -> FileRecord {
    let parsed = parse_key(&object.key);
    let region = parsed.region().map(|r| r.to_string());
    let owner = parsed.owner().map(str::to_string);
    let file_id = parsed.file_id.to_string();
    let file_name = parsed.file_name.to_string();

    FileRecord {
        key: object.key,
        file_id,
        file_name,
        region,
        owner,
        size: object.size,
        last_modified: object.last_modified,
        etag: object.etag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::storage::StorageError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records every call so tests can assert on ordering.
    #[derive(Default)]
    struct RecordingStorage {
        objects: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingStorage {
        fn with(objects: Vec<&'static str>) -> Self {
            Self {
                objects,
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl StorageService for RecordingStorage {
        async fn presign_put(
            &self,
            key: &str,
            _content_type: &str,
            expires_in: Duration,
        ) -> Result<String, StorageError> {
            self.record(format!("presign_put {}", key));
            Ok(format!("https://s3/{}?put&ttl={}", key, expires_in.as_secs()))
        }

        async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, StorageError> {
            self.record(format!("presign_get {}", key));
            Ok(format!("https://s3/{}?get&ttl={}", key, expires_in.as_secs()))
        }

        async fn list_objects(&self, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
            self.record(format!("list {}", prefix));
            Ok(self
                .objects
                .iter()
                .filter(|k| k.starts_with(prefix))
                .map(|k| ObjectSummary {
                    key: k.to_string(),
                    size: 1,
                    last_modified: None,
                    etag: None,
                })
                .collect())
        }

        async fn head_object(&self, key: &str) -> Result<ObjectMetadata, StorageError> {
            self.record(format!("head {}", key));
            if self.objects.iter().any(|k| *k == key) {
                Ok(ObjectMetadata::default())
            } else {
                Err(StorageError::NotFound(key.to_string()))
            }
        }

        async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
            self.record(format!("delete {}", key));
            Ok(())
        }

        async fn ping(&self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_upload_url_never_probes() {
        let storage = Arc::new(RecordingStorage::default());
        let service = FileService::new(storage.clone());

        let url = service
            .issue_upload_url("UK/1_a.png", "image/png", 300)
            .await
            .unwrap();
        assert!(url.ends_with("ttl=300"));
        assert_eq!(storage.calls(), vec!["presign_put UK/1_a.png"]);
    }

    #[tokio::test]
    async fn test_download_probes_before_signing() {
        let storage = Arc::new(RecordingStorage::with(vec!["UK/1_a.png"]));
        let service = FileService::new(storage.clone());

        service.download_url("UK/1_a.png", 3600).await.unwrap();
        assert_eq!(
            storage.calls(),
            vec!["head UK/1_a.png", "presign_get UK/1_a.png"]
        );
    }

    #[tokio::test]
    async fn test_missing_object_is_not_signed_or_deleted() {
        let storage = Arc::new(RecordingStorage::default());
        let service = FileService::new(storage.clone());

        let err = service.download_url("UK/1_gone.png", 3600).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref m) if m == "File not found"));

        let err = service.delete("UK/1_gone.png").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        assert_eq!(storage.calls(), vec!["head UK/1_gone.png", "head UK/1_gone.png"]);
    }

    #[tokio::test]
    async fn test_list_is_prefix_major() {
        let storage = Arc::new(RecordingStorage::with(vec![
            "IRE/3_c.txt",
            "UK/1_a.txt",
            "UK/2_b_final.txt",
        ]));
        let service = FileService::new(storage);

        let records = service
            .list_under(&["UK/".to_string(), "IRE/".to_string()])
            .await
            .unwrap();

        let keys: Vec<_> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["UK/1_a.txt", "UK/2_b_final.txt", "IRE/3_c.txt"]);
        assert_eq!(records[1].file_name, "b_final.txt");
        assert_eq!(records[2].region.as_deref(), Some("IRE"));
        assert!(records[2].owner.is_none());
    }
}
