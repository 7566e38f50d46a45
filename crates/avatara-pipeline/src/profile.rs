//! Profile store boundary.
//!
//! The profile record lives in an external service; the pipeline only needs
//! to read the current avatar record and overwrite it wholesale in a single
//! finalize write. The in-memory implementation backs tests and local
//! development, with a scriptable write fault for finalize-failure paths.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use avatara_core::{AvatarRecord, ClassifiedError, ErrorKind, PipelineResult};
use uuid::Uuid;

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Current avatar record for a user, if one exists.
    async fn get_avatar(&self, user_id: Uuid) -> PipelineResult<Option<AvatarRecord>>;

    /// The atomic finalize write: replace the user's avatar record wholesale.
    /// Either the whole record is stored or nothing changes.
    async fn update_avatar(&self, record: AvatarRecord) -> PipelineResult<()>;
}

/// HashMap-backed profile store for tests and local runs.
#[derive(Default)]
pub struct InMemoryProfileStore {
    records: Mutex<HashMap<Uuid, AvatarRecord>>,
    fail_next_updates: Mutex<u32>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` finalize writes fail.
    pub fn fail_next_updates(&self, n: u32) {
        *self.fail_next_updates.lock().unwrap() = n;
    }

    /// Direct read used by tests to assert the record after a session.
    pub fn record(&self, user_id: Uuid) -> Option<AvatarRecord> {
        self.records.lock().unwrap().get(&user_id).cloned()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_avatar(&self, user_id: Uuid) -> PipelineResult<Option<AvatarRecord>> {
        Ok(self.records.lock().unwrap().get(&user_id).cloned())
    }

    async fn update_avatar(&self, record: AvatarRecord) -> PipelineResult<()> {
        {
            let mut remaining = self.fail_next_updates.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(ClassifiedError::new(
                    ErrorKind::Unknown,
                    "profile write failed",
                ));
            }
        }
        self.records.lock().unwrap().insert(record.user_id, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record_for(user_id: Uuid) -> AvatarRecord {
        AvatarRecord {
            user_id,
            session_id: Uuid::new_v4(),
            legacy_url: "mem://a/full.jpg".to_string(),
            thumbnail_url: "mem://a/thumbnail.jpg".to_string(),
            medium_url: "mem://a/medium.jpg".to_string(),
            full_url: "mem://a/full.jpg".to_string(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_update_overwrites_wholesale() {
        let store = InMemoryProfileStore::new();
        let user = Uuid::new_v4();

        store.update_avatar(record_for(user)).await.unwrap();
        let second = record_for(user);
        store.update_avatar(second.clone()).await.unwrap();

        let stored = store.get_avatar(user).await.unwrap().unwrap();
        assert_eq!(stored, second);
    }

    #[tokio::test]
    async fn test_scripted_failure_leaves_record_untouched() {
        let store = InMemoryProfileStore::new();
        let user = Uuid::new_v4();
        let original = record_for(user);
        store.update_avatar(original.clone()).await.unwrap();

        store.fail_next_updates(1);
        assert!(store.update_avatar(record_for(user)).await.is_err());
        assert_eq!(store.record(user).unwrap(), original);

        // Fault consumed; the next write succeeds.
        store.update_avatar(record_for(user)).await.unwrap();
    }
}
