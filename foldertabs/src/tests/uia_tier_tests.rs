use super::fakes::{ExplorerBehavior, FakeConnector};
use super::{context, context_with_token, fast_options, init_tracing, request, RecordingListener};
use crate::tiers::{Tier, UiAutomationTier};
use crate::{FailureReason, OpenOptions, Step, TierKind, TierOutcome, WindowRect};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn run(
    behavior: ExplorerBehavior,
    options: OpenOptions,
    paths: &[&str],
) -> (TierOutcome, FakeConnector, Arc<RecordingListener>, crate::tiers::TierContext) {
    init_tracing();
    let connector = FakeConnector::new(behavior);
    let tier = UiAutomationTier::new(connector.clone());
    let listener = Arc::new(RecordingListener::default());
    let mut ctx = context(options, listener.clone());
    let outcome = tier.attempt(&request(paths), &mut ctx);
    (outcome, connector, listener, ctx)
}

#[test]
fn opens_every_path_as_a_verified_tab() {
    let (outcome, connector, listener, ctx) = run(
        ExplorerBehavior::default(),
        fast_options(),
        &["/work/a", "/work/b", "/work/c"],
    );

    assert_eq!(outcome, TierOutcome::Success { opened: 3 });
    assert_eq!(connector.state.lock().unwrap().tabs, 3);
    assert_eq!(
        listener.events(),
        vec![
            "progress 0/3 /work/a",
            "progress 1/3 /work/b",
            "progress 2/3 /work/c"
        ]
    );

    let records = ctx.records();
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.matched && r.retries == 0));
    assert_eq!(records[1].observed.as_deref(), Some("/work/c"));
}

#[test]
fn uses_control_actions_before_keystrokes() {
    let (_, connector, _, _) = run(ExplorerBehavior::default(), fast_options(), &["/a", "/b"]);
    assert_eq!(
        connector.calls(),
        vec!["invoke AddButton", "keys ctrl+l", "set /b", "submit"]
    );
}

#[test]
fn failed_attach_is_unavailable() {
    let (outcome, connector, listener, _) = run(
        ExplorerBehavior {
            attach_fails: true,
            ..Default::default()
        },
        fast_options(),
        &["/a", "/b"],
    );

    assert!(outcome.permits_escalation());
    assert_eq!(connector.state.lock().unwrap().connects, 1);
    assert!(listener.events().is_empty());
}

#[test]
fn mismatch_on_third_path_is_a_partial_failure() {
    let mut redirect = HashMap::new();
    redirect.insert("/work/c".to_string(), "/work/elsewhere".to_string());

    let (outcome, _, listener, ctx) = run(
        ExplorerBehavior {
            redirect,
            ..Default::default()
        },
        fast_options(),
        &["/work/a", "/work/b", "/work/c"],
    );

    match outcome {
        TierOutcome::PartialFailure {
            succeeded,
            first_failure,
            failures,
        } => {
            assert_eq!(succeeded, 2);
            assert_eq!(first_failure, 2);
            assert_eq!(failures.len(), 1);
            assert_eq!(
                failures[0].reason,
                FailureReason::VerificationMismatch {
                    observed: "/work/elsewhere".into()
                }
            );
        }
        other => panic!("expected partial failure, got {other:?}"),
    }

    let record = ctx.records().iter().find(|r| r.index == 2).unwrap();
    assert!(!record.matched);
    assert_eq!(record.retries, 2);
    assert!(listener
        .events()
        .iter()
        .any(|e| e.starts_with("failed 2 tab shows")));
}

#[test]
fn failure_in_the_middle_does_not_stop_later_paths() {
    let mut redirect = HashMap::new();
    redirect.insert("/b".to_string(), "/nowhere".to_string());

    let (outcome, connector, _, _) = run(
        ExplorerBehavior {
            redirect,
            ..Default::default()
        },
        fast_options(),
        &["/a", "/b", "/c"],
    );

    match outcome {
        TierOutcome::PartialFailure {
            succeeded,
            first_failure,
            ..
        } => {
            assert_eq!(succeeded, 2);
            assert_eq!(first_failure, 1);
        }
        other => panic!("expected partial failure, got {other:?}"),
    }
    assert_eq!(connector.state.lock().unwrap().location, "/c");
}

#[test]
fn missing_add_button_degrades_to_ctrl_t() {
    let (outcome, connector, _, _) = run(
        ExplorerBehavior {
            add_button_missing: true,
            ..Default::default()
        },
        fast_options(),
        &["/a", "/b"],
    );

    assert_eq!(outcome, TierOutcome::Success { opened: 2 });
    assert_eq!(connector.calls()[0], "keys ctrl+t");
}

#[test]
fn missing_value_pattern_degrades_to_typing() {
    let (outcome, connector, _, _) = run(
        ExplorerBehavior {
            value_pattern_missing: true,
            ..Default::default()
        },
        fast_options(),
        &["/a", "/b"],
    );

    assert_eq!(outcome, TierOutcome::Success { opened: 2 });
    assert!(connector.calls().contains(&"type /b".to_string()));
}

#[test]
fn tab_that_never_appears_times_out() {
    let (outcome, connector, _, _) = run(
        ExplorerBehavior {
            new_tab_ignored: true,
            ..Default::default()
        },
        fast_options(),
        &["/a", "/b", "/c"],
    );

    match outcome {
        TierOutcome::PartialFailure { failures, .. } => {
            assert_eq!(failures.len(), 2);
            assert!(failures.iter().all(|f| f.reason
                == FailureReason::StepTimeout {
                    step: Step::NewTab
                }));
        }
        other => panic!("expected partial failure, got {other:?}"),
    }
    assert!(!connector.calls().iter().any(|c| c == "submit"));
}

#[test]
fn uncountable_tabs_fall_back_to_settling() {
    let (outcome, _, _, _) = run(
        ExplorerBehavior {
            tabs_uncountable: true,
            ..Default::default()
        },
        fast_options(),
        &["/a", "/b"],
    );
    assert_eq!(outcome, TierOutcome::Success { opened: 2 });
}

#[test]
fn unobservable_location_is_accepted_unverified() {
    let (outcome, _, _, ctx) = run(
        ExplorerBehavior {
            location_unobservable: true,
            ..Default::default()
        },
        fast_options(),
        &["/a", "/b"],
    );

    assert_eq!(outcome, TierOutcome::Success { opened: 2 });
    let record = &ctx.records()[0];
    assert_eq!(record.observed, None);
    assert!(!record.matched);
}

#[test]
fn location_that_never_becomes_a_path_times_out() {
    let (outcome, _, _, ctx) = run(
        ExplorerBehavior {
            location_pending: true,
            ..Default::default()
        },
        fast_options(),
        &["/a", "/b"],
    );

    match outcome {
        TierOutcome::PartialFailure { failures, .. } => assert_eq!(
            failures[0].reason,
            FailureReason::StepTimeout {
                step: Step::Navigation
            }
        ),
        other => panic!("expected partial failure, got {other:?}"),
    }
    let record = &ctx.records()[0];
    assert!(!record.matched);
    assert_eq!(record.observed, None);
}

#[test]
fn window_rect_is_applied_after_tabs() {
    let rect = WindowRect::new(10, 20, 800, 600);
    let options = OpenOptions {
        window_rect: Some(rect),
        ..fast_options()
    };
    let (_, connector, _, _) = run(ExplorerBehavior::default(), options, &["/a", "/b"]);
    assert_eq!(connector.state.lock().unwrap().rect, Some(rect));
}

#[test]
fn cancellation_marks_remaining_paths_and_silences_listener() {
    init_tracing();
    let token = CancellationToken::new();
    let listener = Arc::new(RecordingListener {
        cancel_on_progress: Some(token.clone()),
        ..Default::default()
    });
    let connector = FakeConnector::new(ExplorerBehavior::default());
    let tier = UiAutomationTier::new(connector.clone());
    let mut ctx = context_with_token(fast_options(), listener.clone(), token);

    let outcome = tier.attempt(&request(&["/a", "/b", "/c"]), &mut ctx);

    match outcome {
        TierOutcome::PartialFailure {
            succeeded,
            failures,
            ..
        } => {
            assert_eq!(succeeded, 1);
            assert_eq!(failures.iter().map(|f| f.index).collect::<Vec<_>>(), vec![1, 2]);
            assert!(failures.iter().all(|f| f.reason == FailureReason::Cancelled));
        }
        other => panic!("expected partial failure, got {other:?}"),
    }
    assert_eq!(listener.events(), vec!["progress 0/3 /a"]);
    assert_eq!(connector.state.lock().unwrap().tabs, 1);
}

#[test]
fn tier_kind_is_ui_automation() {
    let tier = UiAutomationTier::new(FakeConnector::default());
    assert_eq!(tier.kind(), TierKind::UiAutomation);
}
