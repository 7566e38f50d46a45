//! Avatara Pipeline Library
//!
//! The upload orchestrator and its collaborators: the session state machine,
//! the per-user lock, the classified retry driver and the profile store
//! boundary. The UI layer calls [`UploadOrchestrator::upload_avatar`] and
//! receives either the three committed variant URLs or a single classified
//! error.

pub mod classify;
pub mod lock;
pub mod orchestrator;
pub mod profile;
pub mod retry;
pub mod telemetry;

// Re-export commonly used types
pub use classify::classify_storage_error;
pub use lock::{UserLockGuard, UserLocks};
pub use orchestrator::{UploadFile, UploadOrchestrator};
pub use profile::{InMemoryProfileStore, ProfileStore};
pub use retry::retry_classified;
pub use telemetry::init_tracing;

pub use avatara_core::{
    AvatarRecord, AvatarUrls, ChannelSink, ClassifiedError, ErrorKind, PipelineConfig,
    PipelineResult, ProgressSink, ProgressStage, ProgressUpdate,
};
