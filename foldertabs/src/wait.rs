//! The single waiting primitive of the engine.
//!
//! Tiers never sleep on their own: "has the OS finished reacting" is always a
//! bounded poll through [`CompletionDetector`], and the few places with
//! nothing to observe use [`CompletionDetector::settle`].

use std::thread;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Polls faster than this would flood the target application mid-transition.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// How a wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome<T> {
    Settled(T),
    TimedOut { waited: Duration },
    Cancelled,
}

impl<T> WaitOutcome<T> {
    pub fn is_settled(&self) -> bool {
        matches!(self, WaitOutcome::Settled(_))
    }

    pub fn settled(self) -> Option<T> {
        match self {
            WaitOutcome::Settled(value) => Some(value),
            _ => None,
        }
    }
}

/// Bounded poller. Cheap to build; tiers make one per step.
#[derive(Debug, Clone)]
pub struct CompletionDetector {
    poll_interval: Duration,
    max_wait: Duration,
    cancel: Option<CancellationToken>,
}

impl CompletionDetector {
    pub fn new(poll_interval: Duration, max_wait: Duration) -> Self {
        Self {
            poll_interval: poll_interval.max(MIN_POLL_INTERVAL),
            max_wait,
            cancel: None,
        }
    }

    /// Stop early (with [`WaitOutcome::Cancelled`]) once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }

    /// Call `poll` until it yields a value or `max_wait` elapses.
    ///
    /// `poll` runs at least once, even with a zero `max_wait`, and the final
    /// sleep is shortened so the deadline is never overshot by more than one
    /// poll.
    pub fn wait_for<T, F>(&self, mut poll: F) -> WaitOutcome<T>
    where
        F: FnMut() -> Option<T>,
    {
        let start = Instant::now();
        loop {
            if self.is_cancelled() {
                return WaitOutcome::Cancelled;
            }
            if let Some(value) = poll() {
                return WaitOutcome::Settled(value);
            }

            let elapsed = start.elapsed();
            if elapsed >= self.max_wait {
                debug!("Wait timed out after {:?}", elapsed);
                return WaitOutcome::TimedOut { waited: elapsed };
            }
            thread::sleep(self.poll_interval.min(self.max_wait - elapsed));
        }
    }

    /// Fixed delay of `max_wait`, still interruptible by cancellation.
    /// Returns `false` if cancelled.
    pub fn settle(&self) -> bool {
        !matches!(self.wait_for(|| None::<()>), WaitOutcome::Cancelled)
    }
}
