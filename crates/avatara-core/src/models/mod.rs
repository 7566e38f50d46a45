//! Domain models shared across the pipeline crates.

pub mod avatar;
pub mod session;

pub use avatar::{AvatarRecord, AvatarUrls};
pub use session::{
    SessionState, SourceMeta, UploadSession, VariantKind, VariantRecord, VariantSet, VariantState,
};
