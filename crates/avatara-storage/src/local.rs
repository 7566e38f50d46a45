//! Local filesystem object store.

use crate::traits::{ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalObjectStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    /// Create a new store rooted at `base_path`, serving URLs under `base_url`.
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::Backend(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalObjectStore {
            base_path,
            base_url,
        })
    }

    /// Convert a storage key to a filesystem path, rejecting keys that could
    /// escape the base directory.
    fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(format!(
                "Storage key contains invalid characters: {}",
                key
            )));
        }
        Ok(self.base_path.join(key))
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), key)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> StorageResult<String> {
        let path = self.key_to_path(key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to write file {}: {}", path.display(), e))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        tracing::debug!(key = %key, size_bytes = size, "Local object written");

        Ok(self.url_for(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Idempotent delete: a missing object is not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        if prefix.contains("..") || prefix.starts_with('/') {
            return Err(StorageError::InvalidKey(format!(
                "Prefix contains invalid characters: {}",
                prefix
            )));
        }

        let mut keys = Vec::new();
        let mut pending = vec![self.base_path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(StorageError::Io(e)),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.base_path) {
                    let key = rel.to_string_lossy().replace('\\', "/");
                    if key.starts_with(prefix) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (tempfile::TempDir, LocalObjectStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path(), "http://localhost:3000/media".to_string())
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_put_then_exists_and_url() {
        let (_dir, store) = test_store().await;
        let url = store
            .put("avatars/u/s/thumbnail.jpg", Bytes::from_static(b"data"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, "http://localhost:3000/media/avatars/u/s/thumbnail.jpg");
        assert!(store.exists("avatars/u/s/thumbnail.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, store) = test_store().await;
        store
            .put("avatars/u/s/full.jpg", Bytes::from_static(b"data"), "image/jpeg")
            .await
            .unwrap();
        store.delete("avatars/u/s/full.jpg").await.unwrap();
        assert!(!store.exists("avatars/u/s/full.jpg").await.unwrap());
        // Second delete of a missing object succeeds.
        store.delete("avatars/u/s/full.jpg").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_by_prefix() {
        let (_dir, store) = test_store().await;
        for key in [
            "avatars/u/s1/thumbnail.jpg",
            "avatars/u/s1/medium.jpg",
            "avatars/u/s2/full.jpg",
        ] {
            store
                .put(key, Bytes::from_static(b"data"), "image/jpeg")
                .await
                .unwrap();
        }

        let s1 = store.list("avatars/u/s1/").await.unwrap();
        assert_eq!(s1.len(), 2);
        assert!(s1.iter().all(|k| k.starts_with("avatars/u/s1/")));

        let all = store.list("avatars/u/").await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let (_dir, store) = test_store().await;
        let result = store
            .put("../escape.jpg", Bytes::from_static(b"data"), "image/jpeg")
            .await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));

        let result = store.delete("/absolute.jpg").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }
}
