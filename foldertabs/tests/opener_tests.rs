use foldertabs::{
    ChannelListener, FailureReason, FolderLauncher, FolderPath, OpenError, OpenEvent, OpenListener,
    OpenOptions, OpenOutcome, OpenRequest, PathFailure, PathRules, Tier, TierContext, TierKind,
    TierOutcome, ValidationError, WaitOutcome, WindowRect,
};
use std::fs;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

fn options() -> OpenOptions {
    OpenOptions {
        poll_interval_ms: 10,
        settle_ms: 0,
        ..OpenOptions::default()
    }
}

/// Two real directories to open.
fn folders() -> (TempDir, Vec<String>) {
    let root = tempfile::tempdir().unwrap();
    let paths = ["left", "right"]
        .iter()
        .map(|name| {
            let dir = root.path().join(name);
            fs::create_dir(&dir).unwrap();
            dir.to_string_lossy().into_owned()
        })
        .collect();
    (root, paths)
}

struct Scripted {
    kind: TierKind,
    outcome: TierOutcome,
    calls: Arc<AtomicUsize>,
}

impl Scripted {
    fn boxed(kind: TierKind, outcome: TierOutcome) -> (Box<dyn Tier>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Box::new(Scripted {
                kind,
                outcome,
                calls: calls.clone(),
            }),
            calls,
        )
    }
}

impl Tier for Scripted {
    fn kind(&self) -> TierKind {
        self.kind
    }

    fn attempt(&self, request: &OpenRequest, ctx: &mut TierContext) -> TierOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.outcome.permits_escalation() {
            for (i, folder) in request.iter().enumerate() {
                ctx.progress(i, request.len(), folder);
            }
        }
        self.outcome.clone()
    }
}

/// Holds the worker until released, or until the request is cancelled.
struct Blocking {
    started: Mutex<mpsc::Sender<()>>,
    release: Mutex<mpsc::Receiver<()>>,
}

impl Tier for Blocking {
    fn kind(&self) -> TierKind {
        TierKind::SeparateWindows
    }

    fn attempt(&self, request: &OpenRequest, ctx: &mut TierContext) -> TierOutcome {
        let _ = self.started.lock().unwrap().send(());
        let release = self.release.lock().unwrap();
        let waited = ctx
            .detector(Duration::from_secs(10))
            .wait_for(|| release.try_recv().ok());

        match waited {
            WaitOutcome::Settled(()) => TierOutcome::Success {
                opened: request.len(),
            },
            _ => TierOutcome::from_failures(
                request.len(),
                request
                    .iter()
                    .enumerate()
                    .map(|(index, folder)| PathFailure {
                        index,
                        path: folder.to_string(),
                        reason: FailureReason::Cancelled,
                    })
                    .collect(),
            ),
        }
    }
}

fn blocking() -> (Box<dyn Tier>, mpsc::Receiver<()>, mpsc::Sender<()>) {
    let (started_tx, started_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();
    (
        Box::new(Blocking {
            started: Mutex::new(started_tx),
            release: Mutex::new(release_rx),
        }),
        started_rx,
        release_tx,
    )
}

#[derive(Default)]
struct CountingListener {
    outcomes: AtomicUsize,
}

impl OpenListener for CountingListener {
    fn on_outcome(&self, _outcome: &OpenOutcome) {
        self.outcomes.fetch_add(1, Ordering::SeqCst);
    }
}

async fn wait_until_started(started: &mpsc::Receiver<()>) {
    for _ in 0..500 {
        if started.try_recv().is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("tier never started");
}

#[tokio::test]
async fn invalid_input_reaches_no_tier() {
    let (tier, calls) = Scripted::boxed(TierKind::UiAutomation, TierOutcome::Success { opened: 1 });
    let opener = foldertabs::TabOpener::with_tiers(options(), vec![tier])
        .with_path_rules(PathRules::POSIX);

    let err = opener
        .open_paths_as_tabs(&["/definitely/not/here/foldertabs"])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        OpenError::Validation(ValidationError::NotADirectory { .. })
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!opener.is_busy());
}

#[tokio::test]
async fn unavailable_first_tier_falls_through() {
    let (_root, paths) = folders();
    let (a, a_calls) = Scripted::boxed(TierKind::UiAutomation, TierOutcome::unavailable("no uia"));
    let (b, b_calls) = Scripted::boxed(TierKind::KeystrokeInput, TierOutcome::Success { opened: 2 });
    let opener = foldertabs::TabOpener::with_tiers(options(), vec![a, b])
        .with_path_rules(PathRules::POSIX);

    let outcome = opener.open_paths_as_tabs(&paths).await.unwrap();

    assert_eq!(outcome.tier, TierKind::KeystrokeInput);
    assert_eq!(
        outcome.attempted,
        vec![TierKind::UiAutomation, TierKind::KeystrokeInput]
    );
    assert_eq!(outcome.succeeded, paths);
    assert!(outcome.is_complete());
    assert!(!outcome.degraded);
    assert_eq!(outcome.request_id.len(), 36);
    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b_calls.load(Ordering::SeqCst), 1);
    assert!(!opener.is_busy());
}

#[tokio::test]
async fn partial_failure_is_reported_without_escalating() {
    let (_root, paths) = folders();
    let failure = PathFailure {
        index: 1,
        path: paths[1].clone(),
        reason: FailureReason::VerificationMismatch {
            observed: "/elsewhere".into(),
        },
    };
    let (a, _) = Scripted::boxed(
        TierKind::ScriptedUi,
        TierOutcome::from_failures(2, vec![failure.clone()]),
    );
    let (b, b_calls) = Scripted::boxed(TierKind::SeparateWindows, TierOutcome::Success { opened: 2 });
    let opener = foldertabs::TabOpener::with_tiers(options(), vec![a, b])
        .with_path_rules(PathRules::POSIX);

    let outcome = opener.open_paths_as_tabs(&paths).await.unwrap();

    assert_eq!(outcome.tier, TierKind::ScriptedUi);
    assert_eq!(outcome.succeeded, vec![paths[0].clone()]);
    assert_eq!(outcome.first_failure(), Some(&failure));
    assert!(!outcome.is_complete());
    assert_eq!(b_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn exhausted_tiers_are_an_error() {
    let (_root, paths) = folders();
    let (a, _) = Scripted::boxed(TierKind::ScriptedUi, TierOutcome::unavailable("denied"));
    let opener = foldertabs::TabOpener::with_tiers(options(), vec![a])
        .with_path_rules(PathRules::POSIX);

    let err = opener.open_paths_as_tabs(&paths).await.unwrap_err();
    assert!(matches!(err, OpenError::AllTiersExhausted { .. }));
    assert!(!opener.is_busy());
}

#[tokio::test]
async fn second_request_while_in_flight_is_busy() {
    let (_root, paths) = folders();
    let (tier, started, release) = blocking();
    let opener = Arc::new(
        foldertabs::TabOpener::with_tiers(options(), vec![tier]).with_path_rules(PathRules::POSIX),
    );

    let first = {
        let opener = opener.clone();
        let paths = paths.clone();
        tokio::spawn(async move { opener.open_paths_as_tabs(&paths).await })
    };
    wait_until_started(&started).await;

    assert!(opener.is_busy());
    let err = opener.open_paths_as_tabs(&paths).await.unwrap_err();
    assert!(matches!(err, OpenError::Busy));

    release.send(()).unwrap();
    let outcome = first.await.unwrap().unwrap();
    assert!(outcome.is_complete());
    assert!(!opener.is_busy());
}

#[tokio::test]
async fn shutdown_cancels_the_request_and_silences_the_listener() {
    let (_root, paths) = folders();
    let (tier, started, _release) = blocking();
    let listener = Arc::new(CountingListener::default());
    let opener = Arc::new(
        foldertabs::TabOpener::with_tiers(options(), vec![tier])
            .with_path_rules(PathRules::POSIX)
            .with_listener(listener.clone()),
    );

    let first = {
        let opener = opener.clone();
        let paths = paths.clone();
        tokio::spawn(async move { opener.open_paths_as_tabs(&paths).await })
    };
    wait_until_started(&started).await;
    opener.shutdown();

    let outcome = first.await.unwrap().unwrap();
    assert!(outcome.cancelled);
    assert!(outcome.succeeded.is_empty());
    assert!(outcome
        .failed
        .iter()
        .all(|f| f.reason == FailureReason::Cancelled));
    assert_eq!(listener.outcomes.load(Ordering::SeqCst), 0);
    assert!(!opener.is_busy());
}

#[tokio::test]
async fn channel_listener_sees_progress_then_outcome() {
    let (_root, paths) = folders();
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let (a, _) = Scripted::boxed(TierKind::UiAutomation, TierOutcome::unavailable("no uia"));
    let (b, _) = Scripted::boxed(TierKind::SeparateWindows, TierOutcome::Success { opened: 2 });
    let opener = foldertabs::TabOpener::with_tiers(options(), vec![a, b])
        .with_path_rules(PathRules::POSIX)
        .with_listener(Arc::new(ChannelListener::new(tx)));

    let outcome = opener.open_paths_as_tabs(&paths).await.unwrap();
    assert!(outcome.degraded);

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert_eq!(events.len(), 4);
    assert!(matches!(
        &events[0],
        OpenEvent::Escalated { from: TierKind::UiAutomation, to: TierKind::SeparateWindows, reason } if reason == "no uia"
    ));
    assert!(matches!(&events[1], OpenEvent::Progress { index: 0, total: 2, .. }));
    assert!(matches!(&events[2], OpenEvent::Progress { index: 1, total: 2, .. }));
    match &events[3] {
        OpenEvent::Finished(finished) => assert_eq!(finished.request_id, outcome.request_id),
        other => panic!("expected finished event, got {other:?}"),
    }
}

#[derive(Default)]
struct RecordingLauncher {
    launched: Mutex<Vec<(String, Option<WindowRect>)>>,
}

impl FolderLauncher for RecordingLauncher {
    fn launch(&self, folder: &FolderPath, rect: Option<WindowRect>) -> Result<(), foldertabs::AutomationError> {
        self.launched
            .lock()
            .unwrap()
            .push((folder.to_string(), rect));
        Ok(())
    }
}

#[tokio::test]
async fn open_folder_uses_the_launcher_with_the_window_rect() {
    let (_root, paths) = folders();
    let rect = WindowRect::new(100, 100, 900, 700);
    let launcher = Arc::new(RecordingLauncher::default());
    let opener = foldertabs::TabOpener::with_tiers(
        OpenOptions {
            window_rect: Some(rect),
            ..options()
        },
        Vec::new(),
    )
    .with_path_rules(PathRules::POSIX)
    .with_launcher(launcher.clone());

    opener.open_folder(&paths[0]).await.unwrap();

    assert_eq!(
        *launcher.launched.lock().unwrap(),
        vec![(paths[0].clone(), Some(rect))]
    );
}

#[tokio::test]
async fn open_folder_without_a_launcher_is_unsupported() {
    let (_root, paths) = folders();
    let opener =
        foldertabs::TabOpener::with_tiers(options(), Vec::new()).with_path_rules(PathRules::POSIX);

    let err = opener.open_folder(&paths[0]).await.unwrap_err();
    assert!(matches!(
        err,
        OpenError::Automation(foldertabs::AutomationError::UnsupportedOperation(_))
    ));
}
