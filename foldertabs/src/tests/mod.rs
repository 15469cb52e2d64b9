mod scripted_tier_tests;
mod uia_tier_tests;

use crate::events::OpenListener;
use crate::paths::{FolderPath, OpenRequest, PathKind, PathRules};
use crate::tiers::TierContext;
use crate::{OpenOptions, OpenOutcome, PathFailure, TierKind};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

// Initialize tracing for tests
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_test_writer()
        .try_init();
}

/// Short timeouts so failing waits cost milliseconds, not seconds.
pub fn fast_options() -> OpenOptions {
    OpenOptions {
        window_rect: None,
        poll_interval_ms: 25,
        window_timeout_ms: 300,
        tab_timeout_ms: 200,
        navigation_timeout_ms: 200,
        script_timeout_ms: 200,
        max_verify_attempts: 3,
        settle_ms: 0,
    }
}

pub fn request(paths: &[&str]) -> OpenRequest {
    OpenRequest::from_folders(
        paths
            .iter()
            .map(|p| FolderPath::new(*p, PathKind::Local))
            .collect(),
    )
    .unwrap()
}

pub fn context(options: OpenOptions, listener: Arc<dyn OpenListener>) -> TierContext {
    context_with_token(options, listener, CancellationToken::new())
}

pub fn context_with_token(
    options: OpenOptions,
    listener: Arc<dyn OpenListener>,
    cancel: CancellationToken,
) -> TierContext {
    TierContext::new("test-request", options, PathRules::POSIX, cancel, listener)
}

/// Remembers every callback as a short string, in order.
#[derive(Default)]
pub struct RecordingListener {
    pub events: Mutex<Vec<String>>,
    /// Cancelled from inside the first progress callback when set.
    pub cancel_on_progress: Option<CancellationToken>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl OpenListener for RecordingListener {
    fn on_progress(&self, index: usize, total: usize, path: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("progress {index}/{total} {path}"));
        if let Some(token) = &self.cancel_on_progress {
            token.cancel();
        }
    }

    fn on_path_failed(&self, failure: &PathFailure) {
        self.events
            .lock()
            .unwrap()
            .push(format!("failed {} {}", failure.index, failure.reason));
    }

    fn on_escalation(&self, from: TierKind, to: TierKind, _reason: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("escalated {from} -> {to}"));
    }

    fn on_outcome(&self, outcome: &OpenOutcome) {
        self.events
            .lock()
            .unwrap()
            .push(format!("outcome {}", outcome.tier));
    }
}
