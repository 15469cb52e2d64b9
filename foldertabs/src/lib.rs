//! Open several folders as tabs of one file-manager window.
//!
//! On Windows the tabs go into one Explorer window, driven through UI
//! Automation with keystroke and separate-window fallbacks. On macOS they go
//! into one Finder window, driven through AppleScript with a separate-window
//! fallback. [`TabOpener`] is the entry point.

use std::sync::Arc;
use std::time::Instant;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

pub mod errors;
pub mod escalation;
pub mod events;
pub mod health;
pub mod options;
pub mod outcome;
pub mod paths;
pub mod platforms;
pub mod script;
#[cfg(test)]
mod tests;
pub mod tiers;
pub mod verify;
pub mod wait;

pub use errors::{AutomationError, OpenError, ValidationError};
pub use escalation::{Escalation, EscalationController, InFlightGuard};
pub use events::{ChannelListener, NoopListener, OpenEvent, OpenListener};
pub use health::{check_automation_health, HealthCheckResult, HealthStatus, PlatformHealthCheck};
pub use options::{OpenOptions, WindowRect};
pub use outcome::{FailureReason, OpenOutcome, PathFailure, Step, TierKind, TierOutcome};
pub use paths::{expand_user, strip_quotes, validate, FolderPath, OpenRequest, PathKind, PathRules, Validator};
pub use tiers::{FolderLauncher, Tier, TierContext};
pub use verify::{Verification, VerificationRecord, Verifier};
pub use wait::{CompletionDetector, WaitOutcome};

/// Opens validated folder lists through the platform's ranked tiers.
///
/// One request runs at a time per opener; a second call while one is in
/// flight is rejected with [`OpenError::Busy`].
pub struct TabOpener {
    controller: EscalationController,
    options: OpenOptions,
    rules: PathRules,
    listener: Arc<dyn OpenListener>,
    launcher: Option<Arc<dyn FolderLauncher>>,
    shutdown: CancellationToken,
}

impl TabOpener {
    /// Opener using this platform's tiers.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use foldertabs::{OpenOptions, TabOpener};
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// let opener = TabOpener::new(OpenOptions::default())?;
    /// let outcome = opener.open_paths_as_tabs(&["C:\\src", "C:\\docs"]).await?;
    /// println!("opened {} folders with {}", outcome.succeeded.len(), outcome.tier);
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(options))]
    pub fn new(options: OpenOptions) -> Result<Self, AutomationError> {
        let tiers = platforms::create_tiers()?;
        let launcher = platforms::default_launcher()?;
        Ok(Self::with_tiers(options, tiers).with_launcher(launcher))
    }

    /// Opener over an explicit tier list, tried in the given order.
    pub fn with_tiers(options: OpenOptions, tiers: Vec<Box<dyn Tier>>) -> Self {
        Self {
            controller: EscalationController::new(tiers),
            options,
            rules: PathRules::native(),
            listener: Arc::new(NoopListener),
            launcher: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn OpenListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Launcher used by [`open_folder`](Self::open_folder).
    pub fn with_launcher(mut self, launcher: Arc<dyn FolderLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_path_rules(mut self, rules: PathRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn options(&self) -> &OpenOptions {
        &self.options
    }

    pub fn tier_kinds(&self) -> Vec<TierKind> {
        self.controller.tier_kinds()
    }

    pub fn validate<S: AsRef<str>>(&self, paths: &[S]) -> Result<OpenRequest, ValidationError> {
        Validator::new(self.rules).validate(paths)
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    /// Open `paths` as tabs of one window.
    ///
    /// Validation runs first; invalid input never reaches a tier. Per-path
    /// problems come back inside the [`OpenOutcome`], not as errors.
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub async fn open_paths_as_tabs<S: AsRef<str>>(&self, paths: &[S]) -> Result<OpenOutcome, OpenError> {
        let request = self.validate(paths)?;
        let guard = self.controller.try_begin()?;

        let request_id = Uuid::new_v4().to_string();
        info!(request_id = %request_id, paths = request.len(), "Opening folders as tabs");

        let mut ctx = TierContext::new(
            request_id,
            self.options.clone(),
            self.rules,
            self.shutdown.child_token(),
            Arc::clone(&self.listener),
        );
        let controller = self.controller.clone();
        let listener = Arc::clone(&self.listener);
        let started = Instant::now();

        let outcome = task::spawn_blocking(move || {
            // released when the worker is done, whichever way it ends
            let _guard = guard;

            let escalation = controller.run(&request, &mut ctx)?;
            let mut outcome = OpenOutcome::from_tier(
                ctx.request_id().to_string(),
                &request,
                escalation.tier,
                escalation.attempted,
                &escalation.outcome,
            );
            outcome.verification = ctx.take_records();
            outcome.cancelled = ctx.is_cancelled();
            outcome.elapsed_ms = started.elapsed().as_millis() as u64;

            if !outcome.cancelled {
                listener.on_outcome(&outcome);
            }
            Ok::<_, OpenError>(outcome)
        })
        .await
        .map_err(|e| OpenError::Worker(format!("Task join error: {e}")))?
        .inspect_err(|e| error!("Open request failed: {e}"))?;

        if outcome.cancelled {
            warn!(request_id = %outcome.request_id, "Open request cancelled");
        } else {
            info!(
                request_id = %outcome.request_id,
                tier = %outcome.tier,
                succeeded = outcome.succeeded.len(),
                failed = outcome.failed.len(),
                degraded = outcome.degraded,
                elapsed_ms = outcome.elapsed_ms,
                "Open request finished"
            );
        }
        Ok(outcome)
    }

    /// Open one folder in a new window, without tabs.
    #[instrument(skip(self, path))]
    pub async fn open_folder(&self, path: &str) -> Result<(), OpenError> {
        let request = self.validate(&[path])?;
        let launcher = self.launcher.clone().ok_or_else(|| {
            AutomationError::UnsupportedOperation("no folder launcher configured".to_string())
        })?;
        let rect = self.options.window_rect;

        debug!("Opening single folder {}", request.first());
        task::spawn_blocking(move || launcher.launch(request.first(), rect))
            .await
            .map_err(|e| OpenError::Worker(format!("Task join error: {e}")))??;
        Ok(())
    }

    /// Cancel the in-flight request, if any, and every later one. Remaining
    /// paths are reported as cancelled and no further listener calls are
    /// made.
    pub fn shutdown(&self) {
        info!("Shutting down tab opener");
        self.shutdown.cancel();
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}
