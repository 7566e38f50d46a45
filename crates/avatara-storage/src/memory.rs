//! In-memory object store.
//!
//! Backend used by tests and local development. Supports scripted fault
//! injection so pipeline tests can exercise retry, rollback and finalize
//! paths deterministically.

use crate::traits::{ObjectStore, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Mutex;

/// Raw failure a scripted fault produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Network,
    Timeout,
    Quota,
}

/// Fail the next `times` puts whose key contains `key_substring`.
#[derive(Debug, Clone)]
pub struct PutFault {
    pub key_substring: String,
    pub times: u32,
    pub kind: FaultKind,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
}

#[derive(Default)]
struct Inner {
    objects: HashMap<String, StoredObject>,
    faults: Vec<PutFault>,
    put_calls: u64,
    delete_calls: u64,
}

/// HashMap-backed store with scripted faults.
pub struct InMemoryObjectStore {
    base_url: String,
    inner: Mutex<Inner>,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new("mem://avatara")
    }
}

impl InMemoryObjectStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Script a put failure. Faults are consumed in injection order.
    pub fn inject_put_fault(&self, fault: PutFault) {
        self.inner.lock().unwrap().faults.push(fault);
    }

    /// Number of `put` calls observed, including failed ones.
    pub fn put_calls(&self) -> u64 {
        self.inner.lock().unwrap().put_calls
    }

    /// Number of `delete` calls observed.
    pub fn delete_calls(&self) -> u64 {
        self.inner.lock().unwrap().delete_calls
    }

    /// Stored bytes for a key, if present.
    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.inner
            .lock()
            .unwrap()
            .objects
            .get(key)
            .map(|o| o.data.clone())
    }

    pub fn object_count(&self) -> usize {
        self.inner.lock().unwrap().objects.len()
    }

    /// Content type recorded for a key, if present.
    pub fn object_content_type(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .unwrap()
            .objects
            .get(key)
            .map(|o| o.content_type.clone())
    }

    fn fault_error(kind: FaultKind, key: &str) -> StorageError {
        match kind {
            FaultKind::Network => {
                StorageError::UploadFailed(format!("connection reset writing {}", key))
            }
            FaultKind::Timeout => StorageError::Timeout(format!("put {} timed out", key)),
            FaultKind::Quota => {
                StorageError::QuotaExceeded(format!("quota exhausted writing {}", key))
            }
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> StorageResult<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.put_calls += 1;

        if let Some(pos) = inner
            .faults
            .iter()
            .position(|f| f.times > 0 && key.contains(&f.key_substring))
        {
            let kind = inner.faults[pos].kind;
            inner.faults[pos].times -= 1;
            if inner.faults[pos].times == 0 {
                inner.faults.remove(pos);
            }
            return Err(Self::fault_error(kind, key));
        }

        inner.objects.insert(
            key.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("{}/{}", self.base_url, key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.delete_calls += 1;
        inner.objects.remove(key);
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let inner = self.inner.lock().unwrap();
        let mut keys: Vec<String> = inner
            .objects
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.inner.lock().unwrap().objects.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_delete_round_trip() {
        let store = InMemoryObjectStore::default();
        let url = store
            .put("avatars/u/s/medium.jpg", Bytes::from_static(b"bytes"), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(url, "mem://avatara/avatars/u/s/medium.jpg");
        assert_eq!(
            store.object("avatars/u/s/medium.jpg").unwrap(),
            Bytes::from_static(b"bytes")
        );

        store.delete("avatars/u/s/medium.jpg").await.unwrap();
        assert!(!store.exists("avatars/u/s/medium.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_fault_consumed_then_succeeds() {
        let store = InMemoryObjectStore::default();
        store.inject_put_fault(PutFault {
            key_substring: "thumbnail".to_string(),
            times: 2,
            kind: FaultKind::Network,
        });

        for _ in 0..2 {
            let err = store
                .put("avatars/u/s/thumbnail.jpg", Bytes::new(), "image/jpeg")
                .await
                .unwrap_err();
            assert!(matches!(err, StorageError::UploadFailed(_)));
        }

        store
            .put("avatars/u/s/thumbnail.jpg", Bytes::new(), "image/jpeg")
            .await
            .unwrap();
        assert_eq!(store.put_calls(), 3);
    }

    #[tokio::test]
    async fn test_fault_kinds_map_to_raw_errors() {
        let store = InMemoryObjectStore::default();
        store.inject_put_fault(PutFault {
            key_substring: "a".to_string(),
            times: 1,
            kind: FaultKind::Timeout,
        });
        store.inject_put_fault(PutFault {
            key_substring: "b".to_string(),
            times: 1,
            kind: FaultKind::Quota,
        });

        assert!(matches!(
            store.put("a", Bytes::new(), "image/jpeg").await.unwrap_err(),
            StorageError::Timeout(_)
        ));
        assert!(matches!(
            store.put("b", Bytes::new(), "image/jpeg").await.unwrap_err(),
            StorageError::QuotaExceeded(_)
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_prefix() {
        let store = InMemoryObjectStore::default();
        for key in ["avatars/u1/s/a.jpg", "avatars/u1/s/b.jpg", "avatars/u2/s/c.jpg"] {
            store.put(key, Bytes::new(), "image/jpeg").await.unwrap();
        }
        let keys = store.list("avatars/u1/").await.unwrap();
        assert_eq!(keys.len(), 2);
    }
}
