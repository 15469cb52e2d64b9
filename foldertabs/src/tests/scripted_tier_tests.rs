use super::fakes::{FakeScriptRunner, FinderBehavior};
use super::{context, fast_options, init_tracing, request, RecordingListener};
use crate::script;
use crate::tiers::{ScriptedUiTier, Tier, TierContext};
use crate::{FailureReason, Step, TierOutcome, WindowRect};
use std::collections::HashMap;
use std::sync::Arc;

fn run(
    behavior: FinderBehavior,
    paths: &[&str],
) -> (TierOutcome, FakeScriptRunner, Arc<RecordingListener>, TierContext) {
    init_tracing();
    let runner = FakeScriptRunner::new(behavior);
    let tier = ScriptedUiTier::new(runner.clone());
    let listener = Arc::new(RecordingListener::default());
    let mut ctx = context(fast_options(), listener.clone());
    let outcome = tier.attempt(&request(paths), &mut ctx);
    (outcome, runner, listener, ctx)
}

#[test]
fn opens_tabs_and_verifies_each_target() {
    let (outcome, runner, listener, ctx) =
        run(FinderBehavior::default(), &["/Users/me/a", "/Users/me/b", "/Users/me/c"]);

    assert_eq!(outcome, TierOutcome::Success { opened: 3 });
    assert_eq!(listener.events().len(), 3);
    assert_eq!(ctx.records().len(), 2);
    // Finder's trailing slash is not a mismatch
    assert!(ctx.records().iter().all(|r| r.matched));
    assert_eq!(ctx.records()[0].observed.as_deref(), Some("/Users/me/b/"));

    let scripts = runner.scripts();
    assert!(scripts[0].contains("make new Finder window"));
    let keystroke = scripts
        .iter()
        .position(|s| s == script::NEW_TAB_KEYSTROKE)
        .unwrap();
    let set_target = scripts
        .iter()
        .position(|s| s.contains("set target"))
        .unwrap();
    assert!(keystroke < set_target);
}

#[test]
fn window_bounds_are_part_of_the_open_script() {
    init_tracing();
    let runner = FakeScriptRunner::new(FinderBehavior::default());
    let tier = ScriptedUiTier::new(runner.clone());
    let options = crate::OpenOptions {
        window_rect: Some(WindowRect::new(10, 20, 300, 200)),
        ..fast_options()
    };
    let mut ctx = context(options, Arc::new(RecordingListener::default()));
    tier.attempt(&request(&["/a"]), &mut ctx);

    assert!(runner.scripts()[0].contains("set bounds of front Finder window to {10, 20, 310, 220}"));
}

#[test]
fn failed_open_is_unavailable() {
    let (outcome, runner, listener, _) = run(
        FinderBehavior {
            open_fails: true,
            ..Default::default()
        },
        &["/a", "/b"],
    );

    assert!(outcome.permits_escalation());
    assert_eq!(runner.scripts().len(), 1);
    assert!(listener.events().is_empty());
}

#[test]
fn permission_denied_on_first_keystroke_is_unavailable() {
    let (outcome, _, _, _) = run(
        FinderBehavior {
            keystrokes_before_denial: Some(0),
            ..Default::default()
        },
        &["/a", "/b", "/c"],
    );

    match outcome {
        TierOutcome::Unavailable { reason } => {
            assert!(reason.starts_with("accessibility permission denied"));
            assert!(reason.contains("-1719"));
        }
        other => panic!("expected unavailable, got {other:?}"),
    }
}

#[test]
fn permission_lost_later_is_a_path_failure() {
    let (outcome, _, _, _) = run(
        FinderBehavior {
            keystrokes_before_denial: Some(1),
            ..Default::default()
        },
        &["/a", "/b", "/c"],
    );

    match outcome {
        TierOutcome::PartialFailure {
            succeeded,
            first_failure,
            failures,
        } => {
            assert_eq!(succeeded, 2);
            assert_eq!(first_failure, 2);
            assert!(matches!(
                &failures[0].reason,
                FailureReason::Automation { message } if message.starts_with("permission denied")
            ));
        }
        other => panic!("expected partial failure, got {other:?}"),
    }
}

#[test]
fn target_rejected_while_tab_initializes_is_retried() {
    let (outcome, runner, _, ctx) = run(
        FinderBehavior {
            set_target_rejections: 2,
            ..Default::default()
        },
        &["/a", "/b"],
    );

    assert_eq!(outcome, TierOutcome::Success { opened: 2 });
    let set_targets = runner
        .scripts()
        .iter()
        .filter(|s| s.contains("set target"))
        .count();
    assert_eq!(set_targets, 3);
    // rejections inside one wait do not count as verification retries
    assert_eq!(ctx.records()[0].retries, 0);
}

#[test]
fn unchanged_window_id_times_out() {
    let (outcome, runner, _, _) = run(
        FinderBehavior {
            window_id_frozen: true,
            ..Default::default()
        },
        &["/a", "/b"],
    );

    match outcome {
        TierOutcome::PartialFailure { failures, .. } => assert_eq!(
            failures[0].reason,
            FailureReason::StepTimeout {
                step: Step::WindowIdentifier
            }
        ),
        other => panic!("expected partial failure, got {other:?}"),
    }
    assert!(!runner.scripts().iter().any(|s| s.contains("set target")));
}

#[test]
fn redirected_target_is_a_mismatch_after_all_attempts() {
    let mut redirect = HashMap::new();
    redirect.insert("/b".to_string(), "/elsewhere".to_string());
    let (outcome, _, _, ctx) = run(
        FinderBehavior {
            redirect,
            ..Default::default()
        },
        &["/a", "/b"],
    );

    match outcome {
        TierOutcome::PartialFailure { failures, .. } => assert_eq!(
            failures[0].reason,
            FailureReason::VerificationMismatch {
                observed: "/elsewhere/".into()
            }
        ),
        other => panic!("expected partial failure, got {other:?}"),
    }
    let record = &ctx.records()[0];
    assert!(!record.matched);
    assert_eq!(record.retries, 2);
}

#[test]
fn unreadable_first_window_id_is_read_again_before_the_keystroke() {
    let (outcome, runner, _, _) = run(
        FinderBehavior {
            window_id_read_failures: 1,
            window_id_frozen: true,
            ..Default::default()
        },
        &["/a", "/b"],
    );

    // the baseline is 100, so a frozen 100 after Cmd+T is not a new tab
    match outcome {
        TierOutcome::PartialFailure { failures, .. } => assert_eq!(
            failures[0].reason,
            FailureReason::StepTimeout {
                step: Step::WindowIdentifier
            }
        ),
        other => panic!("expected partial failure, got {other:?}"),
    }
    assert_eq!(runner.count("set target"), 0);
    assert_eq!(runner.state.lock().unwrap().keystrokes, 1);
}

#[test]
fn late_readable_window_id_still_opens_every_tab() {
    let (outcome, _, _, ctx) = run(
        FinderBehavior {
            window_id_read_failures: 2,
            ..Default::default()
        },
        &["/a", "/b", "/c"],
    );

    assert_eq!(outcome, TierOutcome::Success { opened: 3 });
    assert!(ctx.records().iter().all(|r| r.matched));
}

#[test]
fn no_keystroke_without_a_window_id() {
    let (outcome, runner, _, _) = run(
        FinderBehavior {
            window_id_read_failures: usize::MAX,
            ..Default::default()
        },
        &["/a", "/b", "/c"],
    );

    match outcome {
        TierOutcome::PartialFailure {
            succeeded,
            first_failure,
            failures,
        } => {
            assert_eq!(succeeded, 1);
            assert_eq!(first_failure, 1);
            assert_eq!(failures.len(), 2);
            assert!(failures.iter().all(|f| f.reason
                == FailureReason::StepTimeout {
                    step: Step::WindowIdentifier
                }));
        }
        other => panic!("expected partial failure, got {other:?}"),
    }
    assert_eq!(runner.count(script::NEW_TAB_KEYSTROKE), 0);
    assert_eq!(runner.count("set target"), 0);
}

#[test]
fn denied_set_target_ends_the_wait_at_once() {
    let (outcome, runner, _, _) = run(
        FinderBehavior {
            set_target_denied: true,
            ..Default::default()
        },
        &["/a", "/b"],
    );

    match outcome {
        TierOutcome::PartialFailure { failures, .. } => assert!(matches!(
            &failures[0].reason,
            FailureReason::Automation { message }
                if message.starts_with("permission denied") && message.contains("-1743")
        )),
        other => panic!("expected partial failure, got {other:?}"),
    }
    assert_eq!(runner.count("set target"), 1);
}
