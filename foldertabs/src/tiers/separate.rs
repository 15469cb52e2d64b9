//! Last-resort tier: every folder in its own window.
//!
//! Always available. A launch that fails is reported against its path and the
//! remaining folders are still opened.

use super::{cancelled_from, path_failure, Tier, TierContext};
use crate::{AutomationError, FailureReason, FolderPath, OpenRequest, TierKind, TierOutcome, WindowRect};
use tracing::{debug, info};

/// Opens one folder in a new file-manager window, fire and forget.
pub trait FolderLauncher: Send + Sync {
    fn launch(&self, folder: &FolderPath, rect: Option<WindowRect>) -> Result<(), AutomationError>;
}

pub struct SeparateWindowsTier<L> {
    launcher: L,
}

impl<L: FolderLauncher> SeparateWindowsTier<L> {
    pub fn new(launcher: L) -> Self {
        Self { launcher }
    }
}

impl<L: FolderLauncher> Tier for SeparateWindowsTier<L> {
    fn kind(&self) -> TierKind {
        TierKind::SeparateWindows
    }

    fn attempt(&self, request: &OpenRequest, ctx: &mut TierContext) -> TierOutcome {
        info!(
            request_id = %ctx.request_id(),
            "Opening {} folders as separate windows",
            request.len()
        );
        let total = request.len();
        let rect = ctx.options().window_rect;
        let mut failures = Vec::new();

        for (index, folder) in request.iter().enumerate() {
            if ctx.is_cancelled() {
                failures.extend(cancelled_from(request, index));
                break;
            }
            // let the previous window come up before asking for another
            if index > 0 && !ctx.settle(ctx.options().settle()) {
                failures.extend(cancelled_from(request, index));
                break;
            }

            match self.launcher.launch(folder, rect) {
                Ok(()) => {
                    debug!("Launched window [{}/{}] {}", index + 1, total, folder);
                    ctx.progress(index, total, folder);
                }
                Err(e) => {
                    let failure = path_failure(
                        index,
                        folder,
                        FailureReason::LaunchFailed {
                            message: e.to_string(),
                        },
                    );
                    ctx.path_failed(&failure);
                    failures.push(failure);
                }
            }
        }

        TierOutcome::from_failures(total, failures)
    }
}
