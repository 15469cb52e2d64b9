//! Raw input tier: global key events into whatever window is foreground.
//!
//! Nothing here can observe where a tab ended up, so each step is followed by
//! a settle delay and the only check is that our window still has focus
//! before a path starts. A user clicking elsewhere mid-run sends the keys to
//! their window instead; that is a known limitation of this tier.

use super::{cancelled_from, path_failure, Tier, TierContext};
use crate::wait::WaitOutcome;
use crate::{
    AutomationError, FailureReason, FolderPath, OpenRequest, Step, TierKind, TierOutcome,
    WindowRect,
};
use tracing::{debug, info, warn};

/// The window opened for the first folder, driven only through input events.
pub trait KeystrokeSession {
    fn is_foreground(&self) -> bool;

    fn bring_to_foreground(&self) -> Result<(), AutomationError>;

    /// `Ctrl+T`
    fn send_new_tab(&self) -> Result<(), AutomationError>;

    /// `Ctrl+L`
    fn focus_address(&self) -> Result<(), AutomationError>;

    /// Unicode key events, one per UTF-16 unit.
    fn type_text(&self, text: &str) -> Result<(), AutomationError>;

    fn press_enter(&self) -> Result<(), AutomationError>;

    fn apply_rect(&self, rect: WindowRect) -> Result<(), AutomationError>;
}

/// Launches the first folder and finds the window it produced.
pub trait WindowOpener: Send + Sync {
    type Session: KeystrokeSession;

    fn open(&self, first: &FolderPath, ctx: &TierContext) -> Result<Self::Session, AutomationError>;
}

pub struct KeystrokeInputTier<O> {
    opener: O,
}

impl<O: WindowOpener> KeystrokeInputTier<O> {
    pub fn new(opener: O) -> Self {
        Self { opener }
    }

    fn open_tab(
        &self,
        session: &O::Session,
        index: usize,
        folder: &FolderPath,
        ctx: &TierContext,
    ) -> Result<(), FailureReason> {
        ensure_foreground(session, index, ctx)?;

        let settle = ctx.options().settle();
        session.send_new_tab().map_err(input_failure)?;
        pause(ctx, settle)?;
        session.focus_address().map_err(input_failure)?;
        pause(ctx, settle)?;
        session.type_text(folder.as_str()).map_err(input_failure)?;
        pause(ctx, settle)?;
        session.press_enter().map_err(input_failure)?;
        pause(ctx, settle)
    }
}

impl<O: WindowOpener> Tier for KeystrokeInputTier<O> {
    fn kind(&self) -> TierKind {
        TierKind::KeystrokeInput
    }

    fn attempt(&self, request: &OpenRequest, ctx: &mut TierContext) -> TierOutcome {
        let session = match self.opener.open(request.first(), ctx) {
            Ok(session) => session,
            Err(e) => return TierOutcome::unavailable(format!("no window to type into: {e}")),
        };
        info!(request_id = %ctx.request_id(), "Typing tabs into the foreground window");

        let total = request.len();
        ctx.progress(0, total, request.first());

        let mut failures = Vec::new();
        for (index, folder) in request.iter().enumerate().skip(1) {
            if ctx.is_cancelled() {
                failures.extend(cancelled_from(request, index));
                break;
            }
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
                    warn!("Could not move window to {}: {}", rect, e);
                }
            }
        }

        TierOutcome::from_failures(total, failures)
    }
}

fn ensure_foreground<S: KeystrokeSession>(
    session: &S,
    index: usize,
    ctx: &TierContext,
) -> Result<(), FailureReason> {
    if session.is_foreground() {
        return Ok(());
    }
    debug!(index, "Window lost focus, bringing it back");
    if let Err(e) = session.bring_to_foreground() {
        debug!(index, "SetForegroundWindow refused: {e}");
    }

    match ctx
        .detector(ctx.options().tab_timeout())
        .wait_for(|| session.is_foreground().then_some(()))
    {
        WaitOutcome::Settled(()) => Ok(()),
        WaitOutcome::TimedOut { waited } => {
            warn!(
                request_id = %ctx.request_id(),
                index,
                step = %Step::Foreground,
                ?waited,
                "Wait timed out"
            );
            Err(FailureReason::StepTimeout {
                step: Step::Foreground,
            })
        }
        WaitOutcome::Cancelled => Err(FailureReason::Cancelled),
    }
}

fn pause(ctx: &TierContext, delay: std::time::Duration) -> Result<(), FailureReason> {
    if ctx.settle(delay) {
        Ok(())
    } else {
        Err(FailureReason::Cancelled)
    }
}

fn input_failure(e: AutomationError) -> FailureReason {
    FailureReason::Automation {
        message: e.to_string(),
    }
}
