//! Error types module
//!
//! Every failure in the upload pipeline is classified into a closed set of
//! kinds, each carrying a fixed retry policy. A `ClassifiedError` is an
//! immutable value constructed once at the point of classification and never
//! mutated downstream; the orchestrator and callers read its policy fields to
//! decide whether (and how) to retry.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Upper bound for any computed backoff delay.
pub const BACKOFF_CEILING: Duration = Duration::from_secs(30);

/// Closed taxonomy of pipeline failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Source file exceeds the configured byte limit.
    FileTooLarge,
    /// Content type is not in the raster allow-list.
    UnsupportedFormat,
    /// Source bytes do not decode to a sane raster image.
    CorruptImage,
    /// Variant resample/re-encode failed; a different image is required.
    EncodingFailure,
    /// Transient network failure talking to the object store.
    NetworkError,
    /// A single storage call exceeded its deadline.
    Timeout,
    /// Object store rejected the write for quota reasons.
    QuotaExceeded,
    /// One of the three variant uploads exhausted its own retries.
    PartialUploadFailure,
    /// The atomic profile write failed; variants are orphaned in storage.
    FinalizeFailure,
    /// Another upload session for the same user is already active.
    SessionInProgress,
    /// Anything that does not classify into the kinds above.
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FileTooLarge => "file_too_large",
            ErrorKind::UnsupportedFormat => "unsupported_format",
            ErrorKind::CorruptImage => "corrupt_image",
            ErrorKind::EncodingFailure => "encoding_failure",
            ErrorKind::NetworkError => "network_error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::QuotaExceeded => "quota_exceeded",
            ErrorKind::PartialUploadFailure => "partial_upload_failure",
            ErrorKind::FinalizeFailure => "finalize_failure",
            ErrorKind::SessionInProgress => "session_in_progress",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static retry policy for each kind:
/// (retryable, max_retries, base_delay_ms, suggested_action).
/// `max_retries` bounds automatic retries inside the pipeline; a retryable
/// kind with `max_retries = 0` is only ever retried manually by the caller.
fn kind_policy(kind: ErrorKind) -> (bool, u32, u64, Option<&'static str>) {
    match kind {
        ErrorKind::FileTooLarge => (false, 0, 0, Some("Reduce file size and try again")),
        ErrorKind::UnsupportedFormat => (
            false,
            0,
            0,
            Some("Convert the image to JPEG, PNG, WebP or GIF"),
        ),
        ErrorKind::CorruptImage => (false, 0, 0, Some("Try a different image file")),
        ErrorKind::EncodingFailure => (false, 0, 0, Some("Try a different image file")),
        ErrorKind::NetworkError => (true, 3, 250, Some("Retry after a short delay")),
        ErrorKind::Timeout => (true, 3, 250, Some("Retry after a short delay")),
        ErrorKind::QuotaExceeded => (true, 1, 5_000, Some("Retry after the cooldown period")),
        ErrorKind::PartialUploadFailure => (true, 2, 1_000, Some("Retry the upload")),
        ErrorKind::FinalizeFailure => (
            false,
            0,
            0,
            Some("Contact support if your avatar did not update"),
        ),
        ErrorKind::SessionInProgress => (
            true,
            0,
            0,
            Some("Wait for the active upload to finish, then retry"),
        ),
        ErrorKind::Unknown => (false, 0, 0, None),
    }
}

/// A raw failure mapped into the closed taxonomy, with its retry policy
/// resolved at construction time.
#[derive(Debug, Clone, thiserror::Error, Serialize)]
#[error("{kind}: {message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    pub retryable: bool,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl ClassifiedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let (retryable, max_retries, retry_delay_ms, _) = kind_policy(kind);
        Self {
            kind,
            message: message.into(),
            retryable,
            max_retries,
            retry_delay_ms,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Suggested remediation for the caller, if any.
    pub fn suggested_action(&self) -> Option<&'static str> {
        kind_policy(self.kind).3
    }

    /// Backoff delay before retry attempt `attempt` (zero-based): the base
    /// delay doubled per attempt, capped at [`BACKOFF_CEILING`].
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = Duration::from_millis(self.retry_delay_ms);
        let factor = 2u32.saturating_pow(attempt);
        base.saturating_mul(factor).min(BACKOFF_CEILING)
    }
}

/// Result alias used across the pipeline crates.
pub type PipelineResult<T> = Result<T, ClassifiedError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_kinds_not_retryable() {
        for kind in [
            ErrorKind::FileTooLarge,
            ErrorKind::UnsupportedFormat,
            ErrorKind::CorruptImage,
            ErrorKind::EncodingFailure,
        ] {
            let err = ClassifiedError::new(kind, "rejected");
            assert!(!err.is_retryable());
            assert_eq!(err.max_retries, 0);
        }
    }

    #[test]
    fn test_network_kinds_retry_policy() {
        let err = ClassifiedError::new(ErrorKind::NetworkError, "connection reset");
        assert!(err.is_retryable());
        assert_eq!(err.max_retries, 3);

        let err = ClassifiedError::new(ErrorKind::Timeout, "put deadline exceeded");
        assert!(err.is_retryable());
        assert_eq!(err.max_retries, 3);

        let err = ClassifiedError::new(ErrorKind::QuotaExceeded, "quota");
        assert!(err.is_retryable());
        assert_eq!(err.max_retries, 1);
        assert_eq!(err.retry_delay_ms, 5_000);
    }

    #[test]
    fn test_partial_upload_retryable_by_caller() {
        let err = ClassifiedError::new(ErrorKind::PartialUploadFailure, "thumbnail upload failed");
        assert!(err.is_retryable());
        assert_eq!(err.max_retries, 2);
    }

    #[test]
    fn test_finalize_failure_never_auto_retried() {
        let err = ClassifiedError::new(ErrorKind::FinalizeFailure, "profile write failed");
        assert!(!err.is_retryable());
        assert_eq!(err.max_retries, 0);
    }

    #[test]
    fn test_session_in_progress_manual_retry_only() {
        let err = ClassifiedError::new(ErrorKind::SessionInProgress, "busy");
        assert!(err.is_retryable());
        assert_eq!(err.max_retries, 0);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let err = ClassifiedError::new(ErrorKind::NetworkError, "reset");
        assert_eq!(err.backoff_delay(0), Duration::from_millis(250));
        assert_eq!(err.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(err.backoff_delay(2), Duration::from_millis(1_000));
        assert_eq!(err.backoff_delay(20), BACKOFF_CEILING);
    }

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = ClassifiedError::new(ErrorKind::FileTooLarge, "8 MiB exceeds 5 MiB limit");
        let rendered = err.to_string();
        assert!(rendered.contains("file_too_large"));
        assert!(rendered.contains("8 MiB"));
    }
}
