//! Progress reporting contract.
//!
//! Progress is a push-based stream of `{stage, percent, message}` updates
//! delivered in stage order. The `ProgressReporter` wrapper guarantees the
//! percent values a sink observes are monotonically non-decreasing within a
//! session, regardless of how the concurrent variant uploads complete.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Reporting points of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Validating,
    GeneratingVariants,
    UploadingVariants,
    Finalizing,
    Committed,
}

impl ProgressStage {
    /// Baseline percent reported on entering the stage.
    pub fn base_percent(&self) -> u8 {
        match self {
            ProgressStage::Validating => 5,
            ProgressStage::GeneratingVariants => 25,
            ProgressStage::UploadingVariants => 25,
            ProgressStage::Finalizing => 95,
            ProgressStage::Committed => 100,
        }
    }
}

/// One progress update pushed to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: ProgressStage,
    pub percent: u8,
    pub message: String,
}

/// Receiver of progress updates. Invoked zero or more times before the
/// session resolves; implementations must not block.
pub trait ProgressSink: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        self(update)
    }
}

/// Sink that forwards updates into an unbounded channel.
pub struct ChannelSink {
    sender: tokio::sync::mpsc::UnboundedSender<ProgressUpdate>,
}

impl ChannelSink {
    pub fn new(sender: tokio::sync::mpsc::UnboundedSender<ProgressUpdate>) -> Self {
        Self { sender }
    }
}

impl ProgressSink for ChannelSink {
    fn report(&self, update: ProgressUpdate) {
        // Receiver may have hung up (caller navigated away); drop silently.
        let _ = self.sender.send(update);
    }
}

/// Orchestrator-side wrapper enforcing monotonic percent delivery.
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    last_percent: AtomicU8,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            last_percent: AtomicU8::new(0),
        }
    }

    /// Report `percent` for `stage`, clamped so an out-of-order completion
    /// can never push the observed percent backwards.
    pub fn report(&self, stage: ProgressStage, percent: u8, message: impl Into<String>) {
        let prev = self.last_percent.fetch_max(percent, Ordering::SeqCst);
        let effective = prev.max(percent);
        self.sink.report(ProgressUpdate {
            stage,
            percent: effective,
            message: message.into(),
        });
    }

    pub fn report_stage(&self, stage: ProgressStage, message: impl Into<String>) {
        self.report(stage, stage.base_percent(), message);
    }
}
