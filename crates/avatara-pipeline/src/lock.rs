//! Per-user upload lock.
//!
//! The only shared mutable resource in the subsystem: an exclusive, keyed
//! lock serializing upload sessions per user. A second session for a busy
//! user is rejected rather than queued. The guard is held for the session's
//! full lifetime and releases on drop, so every terminal path — commit,
//! failure, panic unwind — frees the user.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use avatara_core::{ClassifiedError, ErrorKind, PipelineResult};
use uuid::Uuid;

/// Keyed exclusive locks, one slot per user.
#[derive(Debug, Default)]
pub struct UserLocks {
    active: Mutex<HashSet<Uuid>>,
}

impl UserLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Acquire the lock for `user_id`, rejecting if a session is active.
    pub fn try_acquire(self: Arc<Self>, user_id: Uuid) -> PipelineResult<UserLockGuard> {
        let mut active = self.active.lock().expect("user lock poisoned");
        if !active.insert(user_id) {
            return Err(ClassifiedError::new(
                ErrorKind::SessionInProgress,
                format!("An upload session is already active for user {}", user_id),
            ));
        }
        drop(active);
        Ok(UserLockGuard {
            locks: self,
            user_id,
        })
    }

    pub fn is_locked(&self, user_id: Uuid) -> bool {
        self.active.lock().expect("user lock poisoned").contains(&user_id)
    }
}

/// RAII guard; dropping it releases the user's slot.
#[derive(Debug)]
pub struct UserLockGuard {
    locks: Arc<UserLocks>,
    user_id: Uuid,
}

impl Drop for UserLockGuard {
    fn drop(&mut self) {
        self.locks
            .active
            .lock()
            .expect("user lock poisoned")
            .remove(&self.user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_rejected() {
        let locks = UserLocks::new();
        let user = Uuid::new_v4();

        let guard = locks.clone().try_acquire(user).unwrap();
        let err = locks.clone().try_acquire(user).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SessionInProgress);
        drop(guard);
    }

    #[test]
    fn test_released_on_drop() {
        let locks = UserLocks::new();
        let user = Uuid::new_v4();

        {
            let _guard = locks.clone().try_acquire(user).unwrap();
            assert!(locks.is_locked(user));
        }
        assert!(!locks.is_locked(user));
        assert!(locks.clone().try_acquire(user).is_ok());
    }

    #[test]
    fn test_distinct_users_independent() {
        let locks = UserLocks::new();
        let _a = locks.clone().try_acquire(Uuid::new_v4()).unwrap();
        let _b = locks.clone().try_acquire(Uuid::new_v4()).unwrap();
    }
}
