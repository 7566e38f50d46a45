//! Shared key generation for storage backends.
//!
//! Key format: `avatars/{user_id}/{session_id}/{kind}.{ext}`. The session
//! segment guarantees two sessions for one user never collide, and makes a
//! failed session's orphans identifiable by prefix.

use avatara_core::VariantKind;
use uuid::Uuid;

/// Key for one variant object of a session.
pub fn variant_key(user_id: Uuid, session_id: Uuid, kind: VariantKind, ext: &str) -> String {
    format!("avatars/{}/{}/{}.{}", user_id, session_id, kind.as_str(), ext)
}

/// Prefix holding every object one session wrote.
pub fn session_prefix(user_id: Uuid, session_id: Uuid) -> String {
    format!("avatars/{}/{}/", user_id, session_id)
}

/// Prefix holding every avatar object of a user, across sessions.
pub fn user_prefix(user_id: Uuid) -> String {
    format!("avatars/{}/", user_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_variant_key_layout() {
        let user = Uuid::new_v4();
        let session = Uuid::new_v4();
        let key = variant_key(user, session, VariantKind::Thumbnail, "jpg");
        assert_eq!(key, format!("avatars/{}/{}/thumbnail.jpg", user, session));
        assert!(key.starts_with(&session_prefix(user, session)));
        assert!(key.starts_with(&user_prefix(user)));
    }

    #[test]
    fn test_sessions_never_collide() {
        let user = Uuid::new_v4();
        let a = variant_key(user, Uuid::new_v4(), VariantKind::Full, "jpg");
        let b = variant_key(user, Uuid::new_v4(), VariantKind::Full, "jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn test_all_kinds_share_session_prefix() {
        let user = Uuid::new_v4();
        let session = Uuid::new_v4();
        let prefix = session_prefix(user, session);
        for kind in VariantKind::ALL {
            assert!(variant_key(user, session, kind, "jpg").starts_with(&prefix));
        }
    }
}
