//! Avatara Core Library
//!
//! Domain models, the classified error taxonomy with its retry policy,
//! pipeline configuration and the progress contract shared across all
//! avatara crates.

pub mod config;
pub mod error;
pub mod models;
pub mod progress;

// Re-export commonly used types
pub use config::{OutputFormat, PipelineConfig, VariantSpec};
pub use error::{ClassifiedError, ErrorKind, PipelineResult, BACKOFF_CEILING};
pub use models::{
    AvatarRecord, AvatarUrls, SessionState, SourceMeta, UploadSession, VariantKind, VariantRecord,
    VariantSet, VariantState,
};
pub use progress::{ChannelSink, ProgressReporter, ProgressSink, ProgressStage, ProgressUpdate};
