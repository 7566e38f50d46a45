//! Persisted avatar record and the public success payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The profile-side avatar record. Created implicitly on first successful
/// upload, overwritten wholesale on each subsequent finalize, never partially
/// updated. `session_id` names the session that produced the current
/// variants, so the previous session's objects can be cleaned up by prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarRecord {
    pub user_id: Uuid,
    pub session_id: Uuid,
    /// Pre-multi-tier field, kept for backward compatibility.
    pub legacy_url: String,
    pub thumbnail_url: String,
    pub medium_url: String,
    pub full_url: String,
    pub updated_at: DateTime<Utc>,
}

impl AvatarRecord {
    pub fn urls(&self) -> AvatarUrls {
        AvatarUrls {
            thumbnail_url: self.thumbnail_url.clone(),
            medium_url: self.medium_url.clone(),
            full_url: self.full_url.clone(),
            legacy_url: self.legacy_url.clone(),
        }
    }
}

/// Success payload of `upload_avatar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvatarUrls {
    pub thumbnail_url: String,
    pub medium_url: String,
    pub full_url: String,
    pub legacy_url: String,
}
