//! Tab-opening strategies.
//!
//! The algorithms here are platform-neutral: each tier is generic over a small
//! driver trait, and `platforms::windows` / `platforms::macos` supply the
//! drivers that actually talk to Explorer or Finder.

use crate::events::OpenListener;
use crate::paths::PathRules;
use crate::verify::{VerificationRecord, Verifier};
use crate::wait::CompletionDetector;
use crate::{FailureReason, FolderPath, OpenOptions, OpenRequest, PathFailure, TierKind, TierOutcome};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub mod keystroke;
pub mod scripted;
pub mod separate;
pub mod uia;

pub use keystroke::{KeystrokeInputTier, KeystrokeSession, WindowOpener};
pub use scripted::{ScriptRunner, ScriptedUiTier};
pub use separate::{FolderLauncher, SeparateWindowsTier};
pub use uia::{ExplorerConnector, ExplorerSession, LocationReading, UiAutomationTier};

/// One ranked strategy for realizing "N paths, N tabs, one window".
///
/// `attempt` never panics and never returns an error: every problem is folded
/// into the returned [`TierOutcome`]. Any session the tier opens is owned by
/// the attempt and dropped before it returns.
pub trait Tier: Send + Sync {
    fn kind(&self) -> TierKind;

    fn attempt(&self, request: &OpenRequest, ctx: &mut TierContext) -> TierOutcome;
}

/// Per-request state handed to each tier attempt.
pub struct TierContext {
    request_id: String,
    options: OpenOptions,
    verifier: Verifier,
    cancel: CancellationToken,
    listener: Arc<dyn OpenListener>,
    records: Vec<VerificationRecord>,
}

impl TierContext {
    pub fn new(
        request_id: impl Into<String>,
        options: OpenOptions,
        rules: PathRules,
        cancel: CancellationToken,
        listener: Arc<dyn OpenListener>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            options,
            verifier: Verifier::new(rules),
            cancel,
            listener,
            records: Vec::new(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    pub fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Detector polling at the configured interval, bounded by `max_wait`.
    pub fn detector(&self, max_wait: Duration) -> CompletionDetector {
        CompletionDetector::new(self.options.poll_interval(), max_wait)
            .with_cancellation(self.cancel.clone())
    }

    /// Fixed delay for steps with nothing observable. `false` if cancelled.
    pub fn settle(&self, delay: Duration) -> bool {
        self.detector(delay).settle()
    }

    pub(crate) fn listener(&self) -> &dyn OpenListener {
        self.listener.as_ref()
    }

    pub fn progress(&self, index: usize, total: usize, folder: &FolderPath) {
        if !self.is_cancelled() {
            self.listener.on_progress(index, total, folder.as_str());
        }
    }

    pub fn path_failed(&self, failure: &PathFailure) {
        warn!(
            request_id = %self.request_id,
            index = failure.index,
            path = %failure.path,
            reason = %failure.reason,
            "Path failed"
        );
        if !self.is_cancelled() {
            self.listener.on_path_failed(failure);
        }
    }

    pub fn record(&mut self, record: VerificationRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[VerificationRecord] {
        &self.records
    }

    pub fn take_records(&mut self) -> Vec<VerificationRecord> {
        std::mem::take(&mut self.records)
    }
}

pub(crate) fn path_failure(index: usize, folder: &FolderPath, reason: FailureReason) -> PathFailure {
    PathFailure {
        index,
        path: folder.to_string(),
        reason,
    }
}

/// Every path from `from` onwards, marked cancelled.
pub(crate) fn cancelled_from(request: &OpenRequest, from: usize) -> Vec<PathFailure> {
    request
        .iter()
        .enumerate()
        .skip(from)
        .map(|(i, folder)| path_failure(i, folder, FailureReason::Cancelled))
        .collect()
}
