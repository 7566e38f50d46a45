//! Upload orchestrator
//!
//! Drives one upload session end to end: validate → generate variants →
//! tiered upload → atomic finalize, with rollback of partially uploaded
//! sessions and best-effort cleanup of the previous avatar's objects after
//! commit. Owns the session state machine and is the only component that
//! performs the finalize write.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use avatara_core::{
    AvatarRecord, AvatarUrls, ClassifiedError, ErrorKind, PipelineConfig, PipelineResult,
    ProgressReporter, ProgressSink, ProgressStage, SessionState, UploadSession, VariantKind,
    VariantState,
};
use avatara_processing::{AvatarValidator, VariantGenerator};
use avatara_storage::{keys, ObjectStore};
use bytes::Bytes;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::classify::classify_storage_error;
use crate::lock::UserLocks;
use crate::profile::ProfileStore;
use crate::retry::retry_classified;

/// Percent floor of the uploading stage; each committed variant adds a step.
const UPLOAD_BASE_PERCENT: u8 = 25;
const UPLOAD_STEP_PERCENT: u8 = 20;

/// The user-submitted file handed to the pipeline.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub data: Bytes,
    pub content_type: String,
}

/// Orchestrates avatar upload sessions. One instance serves all users;
/// the per-user lock serializes sessions per `user_id`.
pub struct UploadOrchestrator {
    store: Arc<dyn ObjectStore>,
    profiles: Arc<dyn ProfileStore>,
    locks: Arc<UserLocks>,
    config: Arc<PipelineConfig>,
}

impl UploadOrchestrator {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        profiles: Arc<dyn ProfileStore>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self {
            store,
            profiles,
            locks: UserLocks::new(),
            config,
        }
    }

    /// Upload a new avatar for `user_id` and atomically link all three
    /// variant URLs to the profile record.
    ///
    /// A session that fails with a rolled-back partial upload is rerun from
    /// scratch, up to the `PartialUploadFailure` retry budget, before the
    /// failure surfaces to the caller.
    ///
    /// Progress updates are pushed to `progress` in stage order with
    /// monotonically non-decreasing percent. Cancelling `cancel` stops the
    /// session at the next stage boundary; uploads already in flight are
    /// allowed to complete and are then rolled back.
    pub async fn upload_avatar(
        &self,
        file: UploadFile,
        user_id: Uuid,
        progress: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> PipelineResult<AvatarUrls> {
        let _guard = Arc::clone(&self.locks).try_acquire(user_id)?;
        let reporter = ProgressReporter::new(progress);

        // Validation and finalize errors are non-retryable, so only a
        // partial-upload failure (already rolled back) reruns the session.
        let result = retry_classified(
            |attempt| self.run_session(file.clone(), user_id, attempt, &reporter, &cancel),
            &cancel,
        )
        .await;

        match &result {
            Ok(urls) => tracing::info!(
                user_id = %user_id,
                full_url = %urls.full_url,
                "Upload session committed"
            ),
            Err(e) => tracing::warn!(
                user_id = %user_id,
                kind = %e.kind,
                error = %e,
                "Upload session failed"
            ),
        }
        result
    }

    async fn run_session(
        &self,
        file: UploadFile,
        user_id: Uuid,
        attempt: u32,
        reporter: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> PipelineResult<AvatarUrls> {
        // Validating. Pure check over the bytes; no storage calls are made
        // for a rejected file.
        reporter.report_stage(ProgressStage::Validating, "Validating image");
        let validator = AvatarValidator::new(&self.config);
        let source = validator.validate(&file.data, &file.content_type)?;

        let mut session = UploadSession::new(user_id, source);
        session.retry_count = attempt;
        session.transition(SessionState::Validating);

        if cancel.is_cancelled() {
            let err = cancelled_error();
            session.fail(err.clone());
            return Err(err);
        }

        // GeneratingVariants. CPU-bound; runs on the blocking pool.
        session.transition(SessionState::GeneratingVariants);
        reporter.report_stage(ProgressStage::GeneratingVariants, "Generating variants");
        let blobs = match VariantGenerator::generate(
            file.data.clone(),
            self.config.variant_specs,
            cancel.child_token(),
        )
        .await
        {
            Ok(blobs) => blobs,
            Err(e) => {
                session.fail(e.clone());
                return Err(e);
            }
        };

        // UploadingVariants. The three puts write disjoint keys and run
        // concurrently; each carries its own deadline and retry budget.
        session.transition(SessionState::UploadingVariants);
        let put_timeout = Duration::from_secs(self.config.put_timeout_secs);
        let completed = AtomicUsize::new(0);

        let mut upload_futs = Vec::with_capacity(blobs.len());
        for blob in &blobs {
            let key = keys::variant_key(user_id, session.session_id, blob.kind, blob.extension);

            let record = session.variants.get_mut(blob.kind);
            record.state = VariantState::Uploading;
            record.remote_path = Some(key.clone());
            record.checksum = Some(blob.checksum.clone());

            let store = Arc::clone(&self.store);
            let data = blob.data.clone();
            let content_type = blob.content_type;
            let kind = blob.kind;
            let cancel = cancel.clone();
            let completed = &completed;
            upload_futs.push(async move {
                let result = retry_classified(
                    |_| {
                        let store = Arc::clone(&store);
                        let key = key.clone();
                        let data = data.clone();
                        let cancel = cancel.clone();
                        async move {
                            // Never start a new attempt after cancellation;
                            // attempts already in flight run to completion.
                            if cancel.is_cancelled() {
                                return Err(cancelled_error());
                            }
                            match tokio::time::timeout(
                                put_timeout,
                                store.put(&key, data, content_type),
                            )
                            .await
                            {
                                Ok(Ok(url)) => Ok(url),
                                Ok(Err(e)) => Err(classify_storage_error(&e)),
                                Err(_) => Err(ClassifiedError::new(
                                    ErrorKind::Timeout,
                                    format!(
                                        "put {} exceeded {}s deadline",
                                        key,
                                        put_timeout.as_secs()
                                    ),
                                )),
                            }
                        }
                    },
                    &cancel,
                )
                .await;

                if result.is_ok() {
                    let n = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    let percent = UPLOAD_BASE_PERCENT
                        .saturating_add(UPLOAD_STEP_PERCENT.saturating_mul(n.min(3) as u8));
                    reporter.report(
                        ProgressStage::UploadingVariants,
                        percent,
                        format!("Uploaded {} variant", kind),
                    );
                }
                (kind, result)
            });
        }

        let outcomes = futures::future::join_all(upload_futs).await;

        let mut first_failure: Option<ClassifiedError> = None;
        for (kind, result) in outcomes {
            let record = session.variants.get_mut(kind);
            match result {
                Ok(url) => {
                    record.state = VariantState::Committed;
                    record.url = Some(url);
                }
                Err(e) => {
                    record.state = VariantState::Failed;
                    if first_failure.is_none() {
                        first_failure = Some(ClassifiedError::new(
                            ErrorKind::PartialUploadFailure,
                            format!("{} variant upload failed: {}", kind, e.message),
                        ));
                    }
                }
            }
        }
        if first_failure.is_none() && cancel.is_cancelled() {
            first_failure = Some(cancelled_error());
        }

        if let Some(failure) = first_failure {
            session.transition(SessionState::RollingBack);
            self.rollback(&session).await;
            session.fail(failure.clone());
            return Err(failure);
        }

        // Finalizing. Single wholesale write linking all three URLs; if it
        // fails the new objects stay orphaned for the external sweep and the
        // profile record is left untouched.
        session.transition(SessionState::Finalizing);
        reporter.report_stage(ProgressStage::Finalizing, "Linking avatar to profile");

        let prior = match self.profiles.get_avatar(user_id).await {
            Ok(prior) => prior,
            Err(e) => {
                let err = ClassifiedError::new(
                    ErrorKind::FinalizeFailure,
                    format!("Failed to read profile record: {}", e.message),
                );
                session.fail(err.clone());
                return Err(err);
            }
        };

        let thumbnail_url = self.committed_url(&session, VariantKind::Thumbnail)?;
        let medium_url = self.committed_url(&session, VariantKind::Medium)?;
        let full_url = self.committed_url(&session, VariantKind::Full)?;
        // First upload seeds the backward-compatible field with the full
        // resolution URL; later uploads preserve it.
        let legacy_url = prior
            .as_ref()
            .map(|p| p.legacy_url.clone())
            .unwrap_or_else(|| full_url.clone());

        let record = AvatarRecord {
            user_id,
            session_id: session.session_id,
            legacy_url: legacy_url.clone(),
            thumbnail_url: thumbnail_url.clone(),
            medium_url: medium_url.clone(),
            full_url: full_url.clone(),
            updated_at: Utc::now(),
        };

        if let Err(e) = self.profiles.update_avatar(record).await {
            let err = ClassifiedError::new(
                ErrorKind::FinalizeFailure,
                format!(
                    "Profile write failed: {}; objects of session {} remain in storage for reconciliation",
                    e.message, session.session_id
                ),
            );
            tracing::error!(
                user_id = %user_id,
                session_id = %session.session_id,
                error = %e,
                "Finalize write failed; variants orphaned"
            );
            session.fail(err.clone());
            return Err(err);
        }

        session.transition(SessionState::Committed);
        reporter.report_stage(ProgressStage::Committed, "Avatar updated");
        tracing::info!(
            session_id = %session.session_id,
            user_id = %user_id,
            retry_count = session.retry_count,
            "Session committed"
        );

        if let Some(prior) = prior {
            if prior.session_id != session.session_id {
                self.spawn_previous_cleanup(user_id, prior.session_id);
            }
        }

        Ok(AvatarUrls {
            thumbnail_url,
            medium_url,
            full_url,
            legacy_url,
        })
    }

    fn committed_url(&self, session: &UploadSession, kind: VariantKind) -> PipelineResult<String> {
        session.variants.get(kind).url.clone().ok_or_else(|| {
            ClassifiedError::new(
                ErrorKind::Unknown,
                format!("missing committed URL for {} variant", kind),
            )
        })
    }

    /// Delete every object this session managed to write. Best-effort: a
    /// failed delete is logged and the remaining deletes still run.
    async fn rollback(&self, session: &UploadSession) {
        for (kind, record) in session.variants.committed() {
            let Some(key) = record.remote_path.as_deref() else {
                continue;
            };
            match self.store.delete(key).await {
                Ok(()) => tracing::debug!(
                    session_id = %session.session_id,
                    kind = %kind,
                    key = %key,
                    "Rolled back variant object"
                ),
                Err(e) => tracing::warn!(
                    session_id = %session.session_id,
                    kind = %kind,
                    key = %key,
                    error = %e,
                    "Rollback delete failed; object left for sweep"
                ),
            }
        }
    }

    /// Fire-and-forget deletion of the previous session's objects. Failure
    /// only logs; it never affects the committed session's outcome.
    fn spawn_previous_cleanup(&self, user_id: Uuid, previous_session: Uuid) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let prefix = keys::session_prefix(user_id, previous_session);
            let objects = match store.list(&prefix).await {
                Ok(objects) => objects,
                Err(e) => {
                    tracing::warn!(prefix = %prefix, error = %e, "Previous avatar cleanup listing failed");
                    return;
                }
            };
            let mut deleted = 0usize;
            for key in objects {
                match store.delete(&key).await {
                    Ok(()) => deleted += 1,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Previous avatar cleanup delete failed")
                    }
                }
            }
            tracing::debug!(prefix = %prefix, deleted, "Previous avatar objects cleaned up");
        });
    }
}

fn cancelled_error() -> ClassifiedError {
    ClassifiedError::new(ErrorKind::PartialUploadFailure, "Session cancelled by caller")
}
