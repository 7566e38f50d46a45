//! Classified retry driver.
//!
//! Runs an operation and retries it according to the policy carried by the
//! classified error it returns: retry only while the kind is retryable and
//! the attempt count stays within the kind's `max_retries`, sleeping the
//! exponential backoff delay between attempts. Cancellation stops further
//! attempts but never aborts one already in flight.

use std::future::Future;

use avatara_core::PipelineResult;
use tokio_util::sync::CancellationToken;

/// Run `op` until it succeeds or its error's policy is exhausted. The
/// operation receives the zero-based attempt number.
pub async fn retry_classified<T, F, Fut>(
    mut op: F,
    cancel: &CancellationToken,
) -> PipelineResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = PipelineResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_retryable() || attempt >= err.max_retries || cancel.is_cancelled() {
                    return Err(err);
                }
                let delay = err.backoff_delay(attempt);
                tracing::warn!(
                    kind = %err.kind,
                    attempt = attempt + 1,
                    max_retries = err.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying after classified failure"
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(err),
                }
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatara_core::{ClassifiedError, ErrorKind};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[tokio::test(start_paused = true)]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = retry_classified(
            |_| async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(ClassifiedError::new(ErrorKind::NetworkError, "reset"))
                } else {
                    Ok(n)
                }
            },
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_max_retries() {
        let calls = AtomicU32::new(0);
        let result: PipelineResult<()> = retry_classified(
            |_| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ClassifiedError::new(ErrorKind::NetworkError, "reset"))
            },
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::NetworkError);
        // One initial call plus max_retries = 3 retries.
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_passes_zero_based_attempt_numbers() {
        let seen: Mutex<Vec<u32>> = Mutex::new(Vec::new());
        let result: PipelineResult<()> = retry_classified(
            |attempt| {
                seen.lock().unwrap().push(attempt);
                async { Err(ClassifiedError::new(ErrorKind::NetworkError, "reset")) }
            },
            &CancellationToken::new(),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let calls = AtomicU32::new(0);
        let result: PipelineResult<()> = retry_classified(
            |_| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ClassifiedError::new(ErrorKind::CorruptImage, "bad"))
            },
            &CancellationToken::new(),
        )
        .await;
        assert_eq!(result.unwrap_err().kind, ErrorKind::CorruptImage);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_retries() {
        let token = CancellationToken::new();
        token.cancel();
        let calls = AtomicU32::new(0);
        let result: PipelineResult<()> = retry_classified(
            |_| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ClassifiedError::new(ErrorKind::NetworkError, "reset"))
            },
            &token,
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
