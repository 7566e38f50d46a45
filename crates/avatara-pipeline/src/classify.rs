//! Raw storage errors mapped into the closed pipeline taxonomy.

use avatara_core::{ClassifiedError, ErrorKind};
use avatara_storage::StorageError;

/// Classify a raw storage failure. Every raw error maps to exactly one kind.
pub fn classify_storage_error(err: &StorageError) -> ClassifiedError {
    let kind = match err {
        StorageError::Timeout(_) => ErrorKind::Timeout,
        StorageError::QuotaExceeded(_) => ErrorKind::QuotaExceeded,
        StorageError::UploadFailed(_)
        | StorageError::DeleteFailed(_)
        | StorageError::Backend(_)
        | StorageError::Io(_) => ErrorKind::NetworkError,
        StorageError::NotFound(_) | StorageError::InvalidKey(_) => ErrorKind::Unknown,
    };
    ClassifiedError::new(kind, err.to_string())
}
