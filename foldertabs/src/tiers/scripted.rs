//! Finder tier: AppleScript through `osascript`, one statement group per call.
//!
//! Before each `Cmd+T` the front window's id must be known, and after it the
//! id is polled until it changes, so `set target` is never sent to the
//! previous tab. Finder can still refuse the target briefly while the tab
//! initializes; that is retried within the tab timeout.

use super::{cancelled_from, path_failure, Tier, TierContext};
use crate::script;
use crate::verify::{Verification, VerificationRecord};
use crate::wait::WaitOutcome;
use crate::{AutomationError, FailureReason, FolderPath, OpenRequest, Step, TierKind, TierOutcome};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Runs one AppleScript and returns its trimmed stdout.
///
/// Implementations report accessibility denial as
/// [`AutomationError::PermissionDenied`] and an overrun as
/// [`AutomationError::Timeout`].
pub trait ScriptRunner: Send + Sync {
    fn run(&self, script: &str, timeout: Duration) -> Result<String, AutomationError>;
}

pub struct ScriptedUiTier<R> {
    runner: R,
}

/// Why adding one tab stopped, with the tier-level case split out.
enum TabError {
    /// Keystrokes are not permitted at all; nothing else will work either.
    PermissionDenied(String),
    Path(FailureReason),
}

impl From<FailureReason> for TabError {
    fn from(reason: FailureReason) -> Self {
        TabError::Path(reason)
    }
}

impl<R: ScriptRunner> ScriptedUiTier<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    fn run(&self, script: &str, ctx: &TierContext) -> Result<String, AutomationError> {
        self.runner.run(script, ctx.options().script_timeout())
    }

    fn front_window_id(&self, ctx: &TierContext) -> Option<String> {
        self.run(script::FRONT_WINDOW_ID, ctx)
            .ok()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
    }

    fn open_tab(
        &self,
        index: usize,
        folder: &FolderPath,
        previous_id: &mut Option<String>,
        ctx: &mut TierContext,
    ) -> Result<(), TabError> {
        // Without a baseline id a new tab cannot be told from the old one.
        let baseline = match previous_id.take() {
            Some(id) => id,
            None => self.wait_for_window_id(index, None, ctx)?,
        };
        *previous_id = Some(baseline.clone());

        match self.run(script::NEW_TAB_KEYSTROKE, ctx) {
            Ok(_) => {}
            Err(AutomationError::PermissionDenied(message)) => {
                return Err(TabError::PermissionDenied(message))
            }
            Err(e) => return Err(automation_failure(e).into()),
        }

        let new_id = self.wait_for_window_id(index, Some(baseline.as_str()), ctx)?;
        *previous_id = Some(new_id);

        let target = folder.as_str();
        let set_target = script::set_target(target);
        let attempts = ctx.options().verify_attempts();
        let mut last_failure = FailureReason::StepTimeout {
            step: Step::SetTarget,
        };
        let mut last_observed = None;

        for attempt in 0..attempts {
            if ctx.is_cancelled() {
                return Err(FailureReason::Cancelled.into());
            }

            match ctx
                .detector(ctx.options().tab_timeout())
                .wait_for(|| match self.run(&set_target, ctx) {
                    Ok(_) => Some(Ok(())),
                    Err(AutomationError::PermissionDenied(message)) => Some(Err(message)),
                    Err(_) => None,
                })
            {
                WaitOutcome::Settled(Ok(())) => {}
                WaitOutcome::Settled(Err(message)) => {
                    warn!(index, attempt, "Finder refused set target: {message}");
                    return Err(FailureReason::Automation {
                        message: format!("permission denied: {message}"),
                    }
                    .into());
                }
                WaitOutcome::TimedOut { waited } => {
                    warn!(
                        request_id = %ctx.request_id(),
                        index,
                        attempt,
                        step = %Step::SetTarget,
                        ?waited,
                        "Wait timed out"
                    );
                    last_failure = FailureReason::StepTimeout {
                        step: Step::SetTarget,
                    };
                    continue;
                }
                WaitOutcome::Cancelled => return Err(FailureReason::Cancelled.into()),
            }

            let observed = match self.run(script::FRONT_TARGET_PATH, ctx) {
                Ok(observed) => observed,
                Err(e) => {
                    debug!(index, attempt, "Could not read back target: {e}");
                    last_failure = automation_failure(e);
                    continue;
                }
            };

            match ctx.verifier().verify(folder, &observed) {
                Verification::Match => {
                    ctx.record(VerificationRecord {
                        index,
                        expected: target.to_string(),
                        observed: Some(observed),
                        matched: true,
                        retries: attempt,
                    });
                    return Ok(());
                }
                Verification::Mismatch { observed, .. } => {
                    warn!(
                        request_id = %ctx.request_id(),
                        index,
                        attempt,
                        expected = %target,
                        observed = %observed,
                        "Verification mismatch"
                    );
                    last_observed = Some(observed.clone());
                    last_failure = FailureReason::VerificationMismatch { observed };
                }
            }
        }

        ctx.record(VerificationRecord {
            index,
            expected: target.to_string(),
            observed: last_observed,
            matched: false,
            retries: attempts - 1,
        });
        Err(last_failure.into())
    }

    /// Front window id, once readable and different from `previous`.
    fn wait_for_window_id(
        &self,
        index: usize,
        previous: Option<&str>,
        ctx: &TierContext,
    ) -> Result<String, FailureReason> {
        match ctx.detector(ctx.options().tab_timeout()).wait_for(|| {
            self.front_window_id(ctx)
                .filter(|id| previous != Some(id.as_str()))
        }) {
            WaitOutcome::Settled(id) => {
                debug!(index, "Front window id now {}", id);
                Ok(id)
            }
            WaitOutcome::TimedOut { waited } => {
                warn!(
                    request_id = %ctx.request_id(),
                    index,
                    step = %Step::WindowIdentifier,
                    ?waited,
                    "Wait timed out"
                );
                Err(FailureReason::StepTimeout {
                    step: Step::WindowIdentifier,
                })
            }
            WaitOutcome::Cancelled => Err(FailureReason::Cancelled),
        }
    }
}

impl<R: ScriptRunner> Tier for ScriptedUiTier<R> {
    fn kind(&self) -> TierKind {
        TierKind::ScriptedUi
    }

    fn attempt(&self, request: &OpenRequest, ctx: &mut TierContext) -> TierOutcome {
        let open = script::open_window(request.first().as_str(), ctx.options().window_rect);
        if let Err(e) = self.run(&open, ctx) {
            return TierOutcome::unavailable(format!("could not open Finder window: {e}"));
        }
        info!(request_id = %ctx.request_id(), "Opened Finder window");

        let total = request.len();
        ctx.progress(0, total, request.first());

        let mut previous_id = None;
        let mut failures = Vec::new();
        for (index, folder) in request.iter().enumerate().skip(1) {
            if ctx.is_cancelled() {
                failures.extend(cancelled_from(request, index));
                break;
            }
            debug!("Adding tab [{}/{}] {}", index + 1, total, folder);
            match self.open_tab(index, folder, &mut previous_id, ctx) {
                Ok(()) => ctx.progress(index, total, folder),
                Err(TabError::PermissionDenied(message)) if index == 1 => {
                    return TierOutcome::unavailable(format!(
                        "accessibility permission denied: {message}"
                    ));
                }
                Err(TabError::PermissionDenied(message)) => {
                    let failure = path_failure(
                        index,
                        folder,
                        FailureReason::Automation {
                            message: format!("permission denied: {message}"),
                        },
                    );
                    ctx.path_failed(&failure);
                    failures.push(failure);
                }
                Err(TabError::Path(reason)) => {
                    let failure = path_failure(index, folder, reason);
                    ctx.path_failed(&failure);
                    failures.push(failure);
                }
            }
        }

        TierOutcome::from_failures(total, failures)
    }
}

fn automation_failure(e: AutomationError) -> FailureReason {
    FailureReason::Automation {
        message: e.to_string(),
    }
}
