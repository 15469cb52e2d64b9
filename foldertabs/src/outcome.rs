use crate::verify::VerificationRecord;
use crate::OpenRequest;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of tab-opening strategies. Each platform ranks a subset of
/// these in a fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    /// Windows: accessibility-tree control of one Explorer window.
    UiAutomation,
    /// Windows: global synthesized key events into the foreground window.
    KeystrokeInput,
    /// macOS: AppleScript driving Finder and System Events.
    ScriptedUi,
    /// Both: one new window per folder. Always available.
    SeparateWindows,
}

impl TierKind {
    /// True for tiers that cannot deliver "one window, N tabs".
    pub fn is_degraded(&self) -> bool {
        matches!(self, TierKind::SeparateWindows)
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TierKind::UiAutomation => "ui_automation",
            TierKind::KeystrokeInput => "keystroke_input",
            TierKind::ScriptedUi => "scripted_ui",
            TierKind::SeparateWindows => "separate_windows",
        })
    }
}

/// The automation step a timeout refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    NewTab,
    Foreground,
    Navigation,
    WindowIdentifier,
    SetTarget,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::NewTab => "new tab",
            Step::Foreground => "foreground",
            Step::Navigation => "navigation",
            Step::WindowIdentifier => "window identifier",
            Step::SetTarget => "set target",
        })
    }
}

/// Why one path of a request did not end up displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    StepTimeout { step: Step },
    VerificationMismatch { observed: String },
    LaunchFailed { message: String },
    Automation { message: String },
    /// The owning context went away before this path was handled.
    Cancelled,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::StepTimeout { step } => write!(f, "timed out waiting for {step}"),
            FailureReason::VerificationMismatch { observed } => {
                write!(f, "tab shows '{observed}' instead")
            }
            FailureReason::LaunchFailed { message } => write!(f, "launch failed: {message}"),
            FailureReason::Automation { message } => write!(f, "automation failed: {message}"),
            FailureReason::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// A path that failed, by its zero-based position in the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathFailure {
    pub index: usize,
    pub path: String,
    pub reason: FailureReason,
}

/// Result of one tier attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TierOutcome {
    Success {
        opened: usize,
    },
    /// Terminal: the tier already mutated OS state, so nothing else runs.
    PartialFailure {
        succeeded: usize,
        first_failure: usize,
        failures: Vec<PathFailure>,
    },
    /// Preconditions unmet before anything irreversible happened. The only
    /// outcome that lets the controller try the next tier.
    Unavailable {
        reason: String,
    },
}

impl TierOutcome {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        TierOutcome::Unavailable {
            reason: reason.into(),
        }
    }

    /// `Success` when nothing failed, `PartialFailure` otherwise.
    pub fn from_failures(total: usize, mut failures: Vec<PathFailure>) -> Self {
        failures.sort_by_key(|f| f.index);
        match failures.first() {
            None => TierOutcome::Success { opened: total },
            Some(first) => TierOutcome::PartialFailure {
                succeeded: total - failures.len(),
                first_failure: first.index,
                failures,
            },
        }
    }

    pub fn permits_escalation(&self) -> bool {
        matches!(self, TierOutcome::Unavailable { .. })
    }
}

/// What the caller gets back for one open action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOutcome {
    pub request_id: String,
    /// The tier that ran to completion.
    pub tier: TierKind,
    /// Every tier tried, in order; the last one is `tier`.
    pub attempted: Vec<TierKind>,
    pub succeeded: Vec<String>,
    pub failed: Vec<PathFailure>,
    /// Folders were opened as separate windows rather than tabs.
    pub degraded: bool,
    /// The owning context was torn down mid-run.
    pub cancelled: bool,
    pub verification: Vec<VerificationRecord>,
    pub elapsed_ms: u64,
}

impl OpenOutcome {
    pub(crate) fn from_tier(
        request_id: String,
        request: &OpenRequest,
        tier: TierKind,
        attempted: Vec<TierKind>,
        outcome: &TierOutcome,
    ) -> Self {
        let failed = match outcome {
            TierOutcome::PartialFailure { failures, .. } => failures.clone(),
            _ => Vec::new(),
        };
        let succeeded = request
            .iter()
            .enumerate()
            .filter(|(i, _)| !failed.iter().any(|f| f.index == *i))
            .map(|(_, folder)| folder.to_string())
            .collect();

        Self {
            request_id,
            tier,
            attempted,
            succeeded,
            failed,
            degraded: tier.is_degraded(),
            cancelled: false,
            verification: Vec::new(),
            elapsed_ms: 0,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && !self.cancelled
    }

    pub fn first_failure(&self) -> Option<&PathFailure> {
        self.failed.first()
    }
}
