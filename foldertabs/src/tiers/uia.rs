//! Accessibility-tree tier: one Explorer window driven through UI Automation.
//!
//! Every step prefers a control-level action (invoke the new-tab button, write
//! the address Edit's value, post Enter to the window) over global input, and
//! degrades to keystrokes for that single step when the control is missing.
//! Only a failed attach makes the whole tier unavailable.

use super::{cancelled_from, path_failure, Tier, TierContext};
use crate::verify::{Verification, VerificationRecord};
use crate::wait::WaitOutcome;
use crate::{
    AutomationError, FailureReason, FolderPath, OpenRequest, Step, TierKind, TierOutcome,
    WindowRect,
};
use tracing::{debug, info, warn};

/// What the address bar currently says about a tab's location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocationReading {
    /// Navigation still in progress: the entry has focus, or the tab shows
    /// something that is not a path yet.
    Pending,
    Location(String),
    /// This window exposes neither an address entry nor a breadcrumb.
    Unobservable,
}

/// One attached Explorer window. Dropping it releases the accessibility
/// handles; the Explorer process is never touched.
pub trait ExplorerSession {
    fn tab_count(&self) -> Result<usize, AutomationError>;

    /// Invoke the tab strip's own "new tab" button.
    fn invoke_new_tab(&self) -> Result<(), AutomationError>;

    /// `Ctrl+T` sent to this window; fallback for [`invoke_new_tab`](Self::invoke_new_tab).
    fn press_new_tab_keys(&self) -> Result<(), AutomationError>;

    /// Put the address bar into edit mode.
    fn focus_address(&self) -> Result<(), AutomationError>;

    /// Write the entry's value directly.
    fn set_address(&self, value: &str) -> Result<(), AutomationError>;

    /// Type into the entry; fallback for [`set_address`](Self::set_address).
    fn type_address(&self, value: &str) -> Result<(), AutomationError>;

    /// Current text of the address entry, before submission.
    fn address_text(&self) -> Result<String, AutomationError>;

    /// Send Enter to the address entry's window rather than to whatever has
    /// focus.
    fn submit_address(&self) -> Result<(), AutomationError>;

    fn read_location(&self) -> LocationReading;

    fn apply_rect(&self, rect: WindowRect) -> Result<(), AutomationError>;
}

/// Opens the first folder in a fresh window and attaches to it.
pub trait ExplorerConnector: Send + Sync {
    type Session: ExplorerSession;

    fn connect(&self, first: &FolderPath, ctx: &TierContext) -> Result<Self::Session, AutomationError>;
}

pub struct UiAutomationTier<C> {
    connector: C,
}

impl<C: ExplorerConnector> UiAutomationTier<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }

    fn open_tab(
        &self,
        session: &C::Session,
        index: usize,
        folder: &FolderPath,
        ctx: &mut TierContext,
    ) -> Result<(), FailureReason> {
        let before = session.tab_count().ok();
        if let Err(e) = session.invoke_new_tab() {
            debug!(index, "New-tab button unavailable ({e}), sending Ctrl+T to the window");
            session.press_new_tab_keys().map_err(automation_failure)?;
        }
        wait_for_new_tab(session, before, index, ctx)?;

        let target = folder.as_str();
        let attempts = ctx.options().verify_attempts();
        let mut last_failure = FailureReason::StepTimeout {
            step: Step::Navigation,
        };
        let mut last_observed = None;

        for attempt in 0..attempts {
            if ctx.is_cancelled() {
                return Err(FailureReason::Cancelled);
            }

            if let Err(e) = session.focus_address() {
                debug!(index, attempt, "Could not focus address bar: {e}");
            }
            if let Err(e) = session.set_address(target) {
                debug!(index, attempt, "ValuePattern write failed ({e}), typing the path");
                session.type_address(target).map_err(automation_failure)?;
            }

            // dropped characters show up here, before navigating anywhere
            if let Ok(text) = session.address_text() {
                if let Verification::Mismatch { observed, .. } = ctx.verifier().verify(folder, &text)
                {
                    warn!(
                        request_id = %ctx.request_id(),
                        index,
                        attempt,
                        expected = %target,
                        observed = %observed,
                        "Address entry mismatch before submit"
                    );
                    last_observed = Some(observed.clone());
                    last_failure = FailureReason::VerificationMismatch { observed };
                    continue;
                }
            }

            session.submit_address().map_err(automation_failure)?;

            match wait_for_location(session, folder, ctx) {
                WaitOutcome::Settled(Some(observed)) => {
                    if ctx.verifier().verify(folder, &observed).is_match() {
                        debug!(index, attempt, "Tab verified at {}", observed);
                        ctx.record(VerificationRecord {
                            index,
                            expected: target.to_string(),
                            observed: Some(observed),
                            matched: true,
                            retries: attempt,
                        });
                        return Ok(());
                    }
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
                WaitOutcome::Settled(None) => {
                    debug!(index, "Location not observable in this window, accepting unverified");
                    ctx.record(VerificationRecord {
                        index,
                        expected: target.to_string(),
                        observed: None,
                        matched: false,
                        retries: attempt,
                    });
                    return Ok(());
                }
                WaitOutcome::TimedOut { waited } => {
                    warn!(
                        request_id = %ctx.request_id(),
                        index,
                        attempt,
                        step = %Step::Navigation,
                        ?waited,
                        "Wait timed out"
                    );
                    last_failure = FailureReason::StepTimeout {
                        step: Step::Navigation,
                    };
                }
                WaitOutcome::Cancelled => return Err(FailureReason::Cancelled),
            }
        }

        ctx.record(VerificationRecord {
            index,
            expected: target.to_string(),
            observed: last_observed,
            matched: false,
            retries: attempts - 1,
        });
        Err(last_failure)
    }
}

impl<C: ExplorerConnector> Tier for UiAutomationTier<C> {
    fn kind(&self) -> TierKind {
        TierKind::UiAutomation
    }

    fn attempt(&self, request: &OpenRequest, ctx: &mut TierContext) -> TierOutcome {
        let session = match self.connector.connect(request.first(), ctx) {
            Ok(session) => session,
            Err(e) => return TierOutcome::unavailable(format!("attach failed: {e}")),
        };
        info!(request_id = %ctx.request_id(), "Attached to Explorer window");

        let total = request.len();
        ctx.progress(0, total, request.first());

        let mut failures = Vec::new();
        for (index, folder) in request.iter().enumerate().skip(1) {
            if ctx.is_cancelled() {
                failures.extend(cancelled_from(request, index));
                break;
            }
            debug!("Adding tab [{}/{}] {}", index + 1, total, folder);
            match self.open_tab(&session, index, folder, ctx) {
                Ok(()) => ctx.progress(index, total, folder),
                Err(reason) => {
                    let failure = path_failure(index, folder, reason);
                    ctx.path_failed(&failure);
                    failures.push(failure);
                }
            }
        }

        if let Some(rect) = ctx.options().window_rect {
            if !ctx.is_cancelled() {
                if let Err(e) = session.apply_rect(rect) {
                    warn!("Could not move Explorer window to {}: {}", rect, e);
                }
            }
        }

        TierOutcome::from_failures(total, failures)
    }
}

fn wait_for_new_tab<S: ExplorerSession>(
    session: &S,
    before: Option<usize>,
    index: usize,
    ctx: &TierContext,
) -> Result<(), FailureReason> {
    let Some(before) = before else {
        // tabs are not countable in this window; give it a moment instead
        return if ctx.settle(ctx.options().settle()) {
            Ok(())
        } else {
            Err(FailureReason::Cancelled)
        };
    };

    match ctx
        .detector(ctx.options().tab_timeout())
        .wait_for(|| session.tab_count().ok().filter(|count| *count > before))
    {
        WaitOutcome::Settled(count) => {
            debug!(index, "Tab count {} -> {}", before, count);
            Ok(())
        }
        WaitOutcome::TimedOut { waited } => {
            warn!(
                request_id = %ctx.request_id(),
                index,
                step = %Step::NewTab,
                ?waited,
                "Wait timed out"
            );
            Err(FailureReason::StepTimeout { step: Step::NewTab })
        }
        WaitOutcome::Cancelled => Err(FailureReason::Cancelled),
    }
}

/// Settles on `Some(location)` once the displayed location either matches the
/// target or reads the same twice in a row; on `None` when the window has no
/// observable location.
fn wait_for_location<S: ExplorerSession>(
    session: &S,
    folder: &FolderPath,
    ctx: &TierContext,
) -> WaitOutcome<Option<String>> {
    let verifier = *ctx.verifier();
    let mut previous: Option<String> = None;

    ctx.detector(ctx.options().navigation_timeout())
        .wait_for(|| match session.read_location() {
            LocationReading::Unobservable => Some(None),
            LocationReading::Pending => {
                previous = None;
                None
            }
            LocationReading::Location(location) => {
                if verifier.equivalent(folder.as_str(), &location)
                    || previous.as_deref() == Some(location.as_str())
                {
                    Some(Some(location))
                } else {
                    previous = Some(location);
                    None
                }
            }
        })
}

fn automation_failure(e: AutomationError) -> FailureReason {
    FailureReason::Automation {
        message: e.to_string(),
    }
}
