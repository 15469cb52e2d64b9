//! Ranked tier escalation and the single in-flight slot.

use crate::tiers::{cancelled_from, Tier, TierContext};
use crate::{OpenError, OpenRequest, TierKind, TierOutcome};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// The tier that ran to completion and what it reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escalation {
    pub tier: TierKind,
    /// Every tier tried, in order, ending with `tier`.
    pub attempted: Vec<TierKind>,
    pub outcome: TierOutcome,
}

enum State {
    Idle,
    TryingTier(usize),
    Done(Escalation),
}

/// Tries tiers in rank order, moving to the next one only on
/// [`TierOutcome::Unavailable`]. Success and partial failure are terminal:
/// once a tier has opened windows, running another would duplicate them.
#[derive(Clone)]
pub struct EscalationController {
    tiers: Arc<[Box<dyn Tier>]>,
    in_flight: Arc<AtomicBool>,
}

impl EscalationController {
    pub fn new(tiers: Vec<Box<dyn Tier>>) -> Self {
        Self {
            tiers: tiers.into(),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn tier_kinds(&self) -> Vec<TierKind> {
        self.tiers.iter().map(|t| t.kind()).collect()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Claim the in-flight slot, or [`OpenError::Busy`] if a request already
    /// holds it. The slot is released when the returned guard drops, and
    /// nowhere else.
    pub fn try_begin(&self) -> Result<InFlightGuard, OpenError> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| OpenError::Busy)?;
        Ok(InFlightGuard {
            flag: Arc::clone(&self.in_flight),
        })
    }

    /// Run the escalation state machine for one validated request.
    pub fn run(&self, request: &OpenRequest, ctx: &mut TierContext) -> Result<Escalation, OpenError> {
        let mut attempted = Vec::with_capacity(self.tiers.len());
        let mut reasons = Vec::new();
        let mut state = State::Idle;

        loop {
            state = match state {
                State::Idle => {
                    if self.tiers.is_empty() {
                        error!(request_id = %ctx.request_id(), "No tiers configured for this platform");
                        return Err(OpenError::AllTiersExhausted {
                            reasons: vec!["no tiers configured".to_string()],
                        });
                    }
                    State::TryingTier(0)
                }
                State::TryingTier(k) => {
                    let tier = &self.tiers[k];
                    let kind = tier.kind();
                    attempted.push(kind);

                    if ctx.is_cancelled() {
                        info!(request_id = %ctx.request_id(), tier = %kind, "Cancelled before tier started");
                        State::Done(Escalation {
                            tier: kind,
                            attempted: std::mem::take(&mut attempted),
                            outcome: TierOutcome::from_failures(
                                request.len(),
                                cancelled_from(request, 0),
                            ),
                        })
                    } else {
                        info!(
                            request_id = %ctx.request_id(),
                            tier = %kind,
                            paths = request.len(),
                            "Trying tier"
                        );
                        match tier.attempt(request, ctx) {
                            TierOutcome::Unavailable { reason } => {
                                reasons.push(format!("{kind}: {reason}"));
                                match self.tiers.get(k + 1) {
                                    Some(next) => {
                                        let next = next.kind();
                                        warn!(
                                            request_id = %ctx.request_id(),
                                            tier = %kind,
                                            next = %next,
                                            reason = %reason,
                                            "Tier unavailable, escalating"
                                        );
                                        if !ctx.is_cancelled() {
                                            ctx.listener().on_escalation(kind, next, &reason);
                                        }
                                        State::TryingTier(k + 1)
                                    }
                                    None => {
                                        error!(
                                            request_id = %ctx.request_id(),
                                            tier = %kind,
                                            reasons = ?reasons,
                                            "Last tier reported unavailable"
                                        );
                                        return Err(OpenError::AllTiersExhausted { reasons });
                                    }
                                }
                            }
                            outcome => {
                                info!(
                                    request_id = %ctx.request_id(),
                                    tier = %kind,
                                    ?outcome,
                                    "Tier finished"
                                );
                                State::Done(Escalation {
                                    tier: kind,
                                    attempted: std::mem::take(&mut attempted),
                                    outcome,
                                })
                            }
                        }
                    }
                }
                State::Done(escalation) => return Ok(escalation),
            };
        }
    }
}

/// Holds the controller's in-flight slot; dropping it frees the slot.
#[derive(Debug)]
pub struct InFlightGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
