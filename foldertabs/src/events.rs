//! Outbound notifications for the presentation and history layers.
//!
//! Listener methods are invoked from the blocking worker thread. The engine
//! stops calling them as soon as the request is cancelled, so an
//! implementation never has to guard against a torn-down UI itself.

use crate::{OpenOutcome, PathFailure, TierKind};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

pub trait OpenListener: Send + Sync {
    /// `index` is zero-based; `total` is the request length.
    fn on_progress(&self, _index: usize, _total: usize, _path: &str) {}

    fn on_path_failed(&self, _failure: &PathFailure) {}

    /// The controller moved from one tier to the next.
    fn on_escalation(&self, _from: TierKind, _to: TierKind, _reason: &str) {}

    /// Once per request, after the worker finished. Not called when the
    /// request was cancelled.
    fn on_outcome(&self, _outcome: &OpenOutcome) {}
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl OpenListener for NoopListener {}

/// Event form of the [`OpenListener`] callbacks, for consumers that would
/// rather drain a channel on their own thread.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OpenEvent {
    Progress {
        index: usize,
        total: usize,
        path: String,
    },
    PathFailed(PathFailure),
    Escalated {
        from: TierKind,
        to: TierKind,
        reason: String,
    },
    Finished(Box<OpenOutcome>),
}

/// Forwards every callback as an [`OpenEvent`]. A closed receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: UnboundedSender<OpenEvent>,
}

impl ChannelListener {
    pub fn new(sender: UnboundedSender<OpenEvent>) -> Self {
        Self { sender }
    }
}

impl OpenListener for ChannelListener {
    fn on_progress(&self, index: usize, total: usize, path: &str) {
        let _ = self.sender.send(OpenEvent::Progress {
            index,
            total,
            path: path.to_string(),
        });
    }

    fn on_path_failed(&self, failure: &PathFailure) {
        let _ = self.sender.send(OpenEvent::PathFailed(failure.clone()));
    }

    fn on_escalation(&self, from: TierKind, to: TierKind, reason: &str) {
        let _ = self.sender.send(OpenEvent::Escalated {
            from,
            to,
            reason: reason.to_string(),
        });
    }

    fn on_outcome(&self, outcome: &OpenOutcome) {
        let _ = self
            .sender
            .send(OpenEvent::Finished(Box::new(outcome.clone())));
    }
}
