use std::fmt;
use std::sync::{Arc, Mutex};
use std::thread;

use async_trait::async_trait;
use chrono::DateTime;
use playtrack_core::model::ReportPayload;
use playtrack_core::time::fixed_clock;
use services::{
    BridgeError, Clock, HostBridges, HostMessageHandler, NativeAnalyticsBridge, ParentFrame,
    ReporterConfig, SessionReporter, SinkError, SubmitOutcome,
};
use storage::repository::{BacklogRepository, InMemoryRepository, StorageError};

#[derive(Default)]
struct RecordingNative {
    sessions: Mutex<Vec<ReportPayload>>,
}

impl NativeAnalyticsBridge for RecordingNative {
    fn track_session(&self, payload: &ReportPayload) -> Result<(), BridgeError> {
        self.sessions.lock().unwrap().push(payload.clone());
        Ok(())
    }
}

struct FailingHost;

impl HostMessageHandler for FailingHost {
    fn post_message(&self, _message: &str) -> Result<(), BridgeError> {
        Err(BridgeError::new("webview detached"))
    }
}

#[derive(Default)]
struct RecordingParent {
    messages: Mutex<Vec<(serde_json::Value, String)>>,
}

impl ParentFrame for RecordingParent {
    fn post_message(
        &self,
        message: &serde_json::Value,
        target_origin: &str,
    ) -> Result<(), BridgeError> {
        self.messages
            .lock()
            .unwrap()
            .push((message.clone(), target_origin.to_string()));
        Ok(())
    }
}

struct BrokenBacklog;

#[async_trait]
impl BacklogRepository for BrokenBacklog {
    async fn append_pending(
        &self,
        _key: &str,
        _payload: &ReportPayload,
        _limit: Option<usize>,
    ) -> Result<usize, StorageError> {
        Err(StorageError::Connection("disk full".into()))
    }

    async fn list_pending(&self, _key: &str) -> Result<Vec<ReportPayload>, StorageError> {
        Ok(Vec::new())
    }

    async fn clear_pending(&self, _key: &str) -> Result<u64, StorageError> {
        Ok(0)
    }
}

/// Metric value whose formatting panics while the session lock is held.
struct ExplodingValue;

impl fmt::Display for ExplodingValue {
    fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
        panic!("metric value could not be formatted")
    }
}

fn plain_reporter(repo: Arc<InMemoryRepository>) -> SessionReporter {
    SessionReporter::with_bridges(
        fixed_clock(),
        ReporterConfig::default(),
        HostBridges::none(),
        repo,
    )
}

#[test]
fn metrics_are_recorded_in_call_order() {
    let reporter = plain_reporter(Arc::new(InMemoryRepository::new()));
    reporter.initialize("math-quest", "morning");
    reporter.add_metric("score", 10);
    reporter.add_metric("accuracy", 0.75);
    reporter.add_metric("hint", true);

    let report = reporter.get_report();
    let pairs: Vec<_> = report
        .metrics
        .iter()
        .map(|m| (m.key.as_str(), m.value.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![("score", "10"), ("accuracy", "0.75"), ("hint", "true")]
    );
}

#[test]
fn ending_a_level_adds_its_xp() {
    let reporter = plain_reporter(Arc::new(InMemoryRepository::new()));
    reporter.initialize("math-quest", "morning");
    reporter.start_level("L1");
    reporter.end_level("L1", true, 1000, 50);

    let report = reporter.get_report();
    let level = &report.levels[0];
    assert!(level.successful());
    assert_eq!(level.time_taken_ms(), 1000);
    assert_eq!(level.xp_earned(), 50);
    assert_eq!(report.xp_total, 50);

    reporter.start_level("L2");
    reporter.end_level("L2", false, 300, 5);
    assert_eq!(reporter.get_report().xp_total, 55);
}

#[test]
fn duplicate_levels_update_the_latest() {
    let reporter = plain_reporter(Arc::new(InMemoryRepository::new()));
    reporter.initialize("math-quest", "morning");
    reporter.start_level("A");
    reporter.start_level("A");
    reporter.end_level("A", true, 700, 20);

    let report = reporter.get_report();
    assert_eq!(report.levels.len(), 2);
    assert!(!report.levels[0].successful());
    assert_eq!(report.levels[0].xp_earned(), 0);
    assert!(report.levels[1].successful());
    assert_eq!(report.levels[1].xp_earned(), 20);
}

#[test]
fn task_success_follows_choice() {
    let reporter = plain_reporter(Arc::new(InMemoryRepository::new()));
    reporter.initialize("math-quest", "morning");
    reporter.start_level("L1");
    reporter.record_task("L1", "t1", "Q", "x", "x", 100, 10);
    reporter.record_task("L1", "t1", "Q", "x", "y", 100, 10);

    let report = reporter.get_report();
    let tasks = report.levels[0].tasks();
    assert!(tasks[0].successful());
    assert!(!tasks[1].successful());
}

#[test]
fn unknown_levels_leave_state_unchanged() {
    let reporter = plain_reporter(Arc::new(InMemoryRepository::new()));
    reporter.initialize("math-quest", "morning");
    reporter.start_level("L1");
    let before = reporter.get_report();

    reporter.end_level("missing", true, 1, 100);
    reporter.record_task("missing", "t1", "Q", "x", "x", 1, 1);

    assert_eq!(reporter.get_report(), before);
}

#[test]
fn reset_keeps_identity() {
    let reporter = plain_reporter(Arc::new(InMemoryRepository::new()));
    reporter.initialize("math-quest", "morning");
    reporter.add_metric("k", "v");
    reporter.start_level("L1");
    reporter.end_level("L1", true, 10, 30);

    reporter.reset();

    let report = reporter.get_report();
    assert!(report.metrics.is_empty());
    assert!(report.levels.is_empty());
    assert_eq!(report.xp_total, 0);
    assert_eq!(report.game_id, "math-quest");
    assert_eq!(report.session_name, "morning");
    assert!(reporter.is_initialized());
}

#[test]
fn reports_are_independent_copies() {
    let reporter = plain_reporter(Arc::new(InMemoryRepository::new()));
    reporter.initialize("math-quest", "morning");
    reporter.add_metric("k", "v");
    reporter.start_level("L1");

    let mut report = reporter.get_report();
    report.metrics.clear();
    report.levels.clear();
    report.xp_total = 999;

    let fresh = reporter.get_report();
    assert_eq!(fresh.metrics.len(), 1);
    assert_eq!(fresh.levels.len(), 1);
    assert_eq!(fresh.xp_total, 0);
}

#[tokio::test]
async fn submissions_get_distinct_ids_and_ordered_timestamps() {
    let repo = Arc::new(InMemoryRepository::new());
    let reporter = SessionReporter::with_bridges(
        Clock::default_clock(),
        ReporterConfig::default(),
        HostBridges::none(),
        repo.clone(),
    );
    reporter.initialize("math-quest", "morning");

    let first = reporter.submit_report().await;
    let second = reporter.submit_report().await;
    let first = &first.submitted().expect("first submitted").payload;
    let second = &second.submitted().expect("second submitted").payload;

    assert_ne!(first.session_id, second.session_id);

    let parse = |p: &ReportPayload| {
        DateTime::parse_from_rfc3339(p.timestamp.as_deref().expect("timestamp")).unwrap()
    };
    assert!(parse(first) <= parse(second));
    assert_eq!(repo.list_pending("pendingSessions").await.unwrap().len(), 2);
}

#[tokio::test]
async fn payload_mirrors_xp_total() {
    let reporter = plain_reporter(Arc::new(InMemoryRepository::new()));
    reporter.initialize("math-quest", "morning");
    reporter.start_level("L1");
    reporter.end_level("L1", true, 1000, 40);

    let outcome = reporter.submit_report().await;
    let payload = &outcome.submitted().expect("submitted").payload;
    assert_eq!(payload.xp_earned_total, 40);
    assert_eq!(payload.xp_earned, 40);
    assert_eq!(payload.xp_total, 40);
    assert_eq!(payload.best_xp, 40);
    assert_eq!(payload.name, "morning");
}

#[tokio::test]
async fn fan_out_continues_past_failing_channels() {
    let native = Arc::new(RecordingNative::default());
    let parent = Arc::new(RecordingParent::default());
    let repo = Arc::new(InMemoryRepository::new());

    let reporter = SessionReporter::with_bridges(
        fixed_clock(),
        ReporterConfig::default().with_target_origin("https://portal.example.com"),
        HostBridges::none()
            .with_native(native.clone())
            .with_host(Arc::new(FailingHost))
            .with_parent(parent.clone()),
        repo.clone(),
    );
    reporter.initialize("math-quest", "morning");
    reporter.add_metric("k", "v");

    let outcome = reporter.submit_report().await;
    let submitted = outcome.submitted().expect("submitted");

    assert_eq!(
        submitted.delivery.succeeded(),
        vec!["native_analytics", "parent_frame"]
    );
    assert_eq!(
        submitted.delivery.attempts()[1].result,
        Err(SinkError::Failed("webview detached".into()))
    );

    assert_eq!(native.sessions.lock().unwrap().len(), 1);
    let messages = parent.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].1, "https://portal.example.com");
    assert_eq!(messages[0].0["gameId"], "math-quest");
    assert_eq!(messages[0].0["rawData"][0]["value"], "v");

    assert!(submitted.persisted);
    assert_eq!(repo.list_pending("pendingSessions").await.unwrap().len(), 1);
}

#[tokio::test]
async fn undelivered_payload_is_still_persisted() {
    let repo = Arc::new(InMemoryRepository::new());
    let reporter = plain_reporter(repo.clone());
    reporter.initialize("math-quest", "morning");

    let outcome = reporter.submit_report().await;
    let submitted = outcome.submitted().expect("submitted");

    assert!(!submitted.delivery.is_delivered());
    assert!(
        submitted
            .delivery
            .attempts()
            .iter()
            .all(|a| a.result == Err(SinkError::Unavailable))
    );
    assert!(submitted.persisted);

    let stored = repo.list_pending("pendingSessions").await.unwrap();
    assert_eq!(stored, vec![submitted.payload.clone()]);
}

#[tokio::test]
async fn backlog_failure_is_swallowed() {
    let native = Arc::new(RecordingNative::default());
    let reporter = SessionReporter::with_bridges(
        fixed_clock(),
        ReporterConfig::default(),
        HostBridges::none().with_native(native.clone()),
        Arc::new(BrokenBacklog),
    );
    reporter.initialize("math-quest", "morning");

    let outcome = reporter.submit_report().await;
    let submitted = outcome.submitted().expect("submitted");

    assert!(submitted.delivery.is_delivered());
    assert!(!submitted.persisted);
}

#[tokio::test]
async fn backlog_respects_configured_limit() {
    let repo = Arc::new(InMemoryRepository::new());
    let reporter = SessionReporter::with_bridges(
        fixed_clock(),
        ReporterConfig::default().with_backlog_limit(Some(2)),
        HostBridges::none(),
        repo.clone(),
    );
    reporter.initialize("math-quest", "morning");

    for xp in [1, 2, 3] {
        reporter.reset();
        reporter.start_level("L1");
        reporter.end_level("L1", true, 10, xp);
        reporter.submit_report().await;
    }

    let kept: Vec<i64> = repo
        .list_pending("pendingSessions")
        .await
        .unwrap()
        .iter()
        .map(|p| p.xp_total)
        .collect();
    assert_eq!(kept, vec![2, 3]);
}

#[tokio::test]
async fn uninitialized_submit_sends_nothing() {
    let native = Arc::new(RecordingNative::default());
    let repo = Arc::new(InMemoryRepository::new());
    let reporter = SessionReporter::with_bridges(
        fixed_clock(),
        ReporterConfig::default(),
        HostBridges::none().with_native(native.clone()),
        repo.clone(),
    );

    assert_eq!(reporter.submit_report().await, SubmitOutcome::Skipped);
    assert!(native.sessions.lock().unwrap().is_empty());
    assert!(repo.list_pending("pendingSessions").await.unwrap().is_empty());
}

fn assert_xp_matches_levels(reporter: &SessionReporter) {
    let report = reporter.get_report();
    assert_eq!(report.xp_total, report.level_xp_sum());
}

#[test]
fn xp_total_tracks_levels_through_every_call() {
    let reporter = plain_reporter(Arc::new(InMemoryRepository::new()));
    reporter.initialize("math-quest", "morning");
    assert_xp_matches_levels(&reporter);

    reporter.start_level("A");
    assert_xp_matches_levels(&reporter);
    reporter.start_level("A");
    assert_xp_matches_levels(&reporter);
    reporter.end_level("A", true, 100, 30);
    assert_xp_matches_levels(&reporter);
    reporter.end_level("A", false, 120, -5);
    assert_xp_matches_levels(&reporter);
    reporter.record_task("A", "t1", "Q", "x", "x", 10, 10);
    assert_xp_matches_levels(&reporter);
    reporter.start_level("B");
    reporter.end_level("B", true, 50, 12);
    assert_xp_matches_levels(&reporter);
    assert_eq!(reporter.get_report().xp_total, 7);

    reporter.end_level("missing", true, 1, 1_000);
    assert_xp_matches_levels(&reporter);

    reporter.reset();
    assert_xp_matches_levels(&reporter);
    assert_eq!(reporter.get_report().xp_total, 0);

    reporter.start_level("C");
    reporter.end_level("C", true, 10, 8);
    assert_xp_matches_levels(&reporter);
    assert_eq!(reporter.get_report().xp_total, 8);
}

#[tokio::test]
async fn reporter_keeps_working_after_a_panic_inside_the_lock() {
    let repo = Arc::new(InMemoryRepository::new());
    let reporter = Arc::new(plain_reporter(repo.clone()));
    reporter.initialize("math-quest", "morning");
    reporter.start_level("L1");

    let worker = Arc::clone(&reporter);
    let joined = thread::spawn(move || worker.add_metric("broken", ExplodingValue)).join();
    assert!(joined.is_err());

    reporter.end_level("L1", true, 10, 7);
    reporter.add_metric("after", "ok");

    let report = reporter.get_report();
    assert!(reporter.is_initialized());
    assert_eq!(report.xp_total, 7);
    assert_eq!(report.level_xp_sum(), 7);
    assert_eq!(report.metrics.len(), 1);
    assert_eq!(report.metrics[0].key, "after");

    let outcome = reporter.submit_report().await;
    assert!(outcome.submitted().is_some_and(|s| s.persisted));
    assert_eq!(
        repo.list_pending(reporter.backlog_key()).await.unwrap().len(),
        1
    );
}
