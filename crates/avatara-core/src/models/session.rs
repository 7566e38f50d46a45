//! Upload session model and state machine types.
//!
//! An `UploadSession` is ephemeral and owned exclusively by one orchestrator
//! invocation. Its state only moves forward along the legal transitions;
//! `transition` logs every change and asserts legality in debug builds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClassifiedError;

/// The named resolution class a variant belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    Thumbnail,
    Medium,
    Full,
}

impl VariantKind {
    pub const ALL: [VariantKind; 3] = [VariantKind::Thumbnail, VariantKind::Medium, VariantKind::Full];

    pub fn as_str(&self) -> &'static str {
        match self {
            VariantKind::Thumbnail => "thumbnail",
            VariantKind::Medium => "medium",
            VariantKind::Full => "full",
        }
    }
}

impl std::fmt::Display for VariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-variant upload status within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantState {
    #[default]
    Pending,
    Uploading,
    Committed,
    Failed,
}

/// Source image metadata, read exactly once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceMeta {
    pub byte_size: usize,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
}

/// Tracking record for one variant of the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantRecord {
    pub state: VariantState,
    pub remote_path: Option<String>,
    pub url: Option<String>,
    pub checksum: Option<String>,
}

/// Fixed set of the three variant records, indexed by kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariantSet {
    thumbnail: VariantRecord,
    medium: VariantRecord,
    full: VariantRecord,
}

impl VariantSet {
    pub fn get(&self, kind: VariantKind) -> &VariantRecord {
        match kind {
            VariantKind::Thumbnail => &self.thumbnail,
            VariantKind::Medium => &self.medium,
            VariantKind::Full => &self.full,
        }
    }

    pub fn get_mut(&mut self, kind: VariantKind) -> &mut VariantRecord {
        match kind {
            VariantKind::Thumbnail => &mut self.thumbnail,
            VariantKind::Medium => &mut self.medium,
            VariantKind::Full => &mut self.full,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (VariantKind, &VariantRecord)> + '_ {
        VariantKind::ALL.iter().map(move |k| (*k, self.get(*k)))
    }

    /// Variants whose bytes reached storage in this session.
    pub fn committed(&self) -> Vec<(VariantKind, &VariantRecord)> {
        self.iter()
            .filter(|(_, v)| v.state == VariantState::Committed)
            .collect()
    }
}

/// Orchestrator states for one upload session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Validating,
    GeneratingVariants,
    UploadingVariants,
    Finalizing,
    Committed,
    RollingBack,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Committed | SessionState::Failed)
    }

    /// Legal forward transitions of the state machine.
    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, GeneratingVariants)
                | (Validating, Failed)
                | (GeneratingVariants, UploadingVariants)
                | (GeneratingVariants, Failed)
                | (UploadingVariants, Finalizing)
                | (UploadingVariants, RollingBack)
                | (Finalizing, Committed)
                | (Finalizing, Failed)
                | (RollingBack, Failed)
        )
    }
}

/// One end-to-end attempt to upload and commit a new avatar for a user.
#[derive(Debug, Clone)]
pub struct UploadSession {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub source: SourceMeta,
    pub variants: VariantSet,
    pub state: SessionState,
    pub retry_count: u32,
    pub last_error: Option<ClassifiedError>,
}

impl UploadSession {
    pub fn new(user_id: Uuid, source: SourceMeta) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            user_id,
            source,
            variants: VariantSet::default(),
            state: SessionState::Idle,
            retry_count: 0,
            last_error: None,
        }
    }

    /// Move the session to `next`, logging the transition.
    pub fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(
            session_id = %self.session_id,
            user_id = %self.user_id,
            from = ?self.state,
            to = ?next,
            "Session state transition"
        );
        self.state = next;
    }

    /// Record a terminal failure on the session.
    pub fn fail(&mut self, error: ClassifiedError) {
        self.last_error = Some(error);
        self.transition(SessionState::Failed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn test_source() -> SourceMeta {
        SourceMeta {
            byte_size: 2048,
            content_type: "image/jpeg".to_string(),
            width: 640,
            height: 480,
        }
    }

    #[test]
    fn test_happy_path_transitions_legal() {
        let path = [
            SessionState::Validating,
            SessionState::GeneratingVariants,
            SessionState::UploadingVariants,
            SessionState::Finalizing,
            SessionState::Committed,
        ];
        let mut session = UploadSession::new(Uuid::new_v4(), test_source());
        for next in path {
            assert!(session.state.can_transition_to(next));
            session.transition(next);
        }
        assert!(session.state.is_terminal());
    }

    #[test]
    fn test_rollback_only_from_uploading() {
        assert!(SessionState::UploadingVariants.can_transition_to(SessionState::RollingBack));
        assert!(!SessionState::Validating.can_transition_to(SessionState::RollingBack));
        assert!(!SessionState::Finalizing.can_transition_to(SessionState::RollingBack));
        assert!(SessionState::RollingBack.can_transition_to(SessionState::Failed));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for next in [
            SessionState::Idle,
            SessionState::Validating,
            SessionState::UploadingVariants,
        ] {
            assert!(!SessionState::Committed.can_transition_to(next));
            assert!(!SessionState::Failed.can_transition_to(next));
        }
    }

    #[test]
    fn test_fail_records_last_error() {
        let mut session = UploadSession::new(Uuid::new_v4(), test_source());
        session.transition(SessionState::Validating);
        session.fail(crate::error::ClassifiedError::new(
            ErrorKind::CorruptImage,
            "not decodable",
        ));
        assert_eq!(session.state, SessionState::Failed);
        assert_eq!(
            session.last_error.as_ref().map(|e| e.kind),
            Some(ErrorKind::CorruptImage)
        );
    }

    #[test]
    fn test_variant_set_committed_filter() {
        let mut set = VariantSet::default();
        set.get_mut(VariantKind::Medium).state = VariantState::Committed;
        set.get_mut(VariantKind::Thumbnail).state = VariantState::Failed;
        let committed = set.committed();
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].0, VariantKind::Medium);
    }
}
