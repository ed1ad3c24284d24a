use std::fmt::Display;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use playtrack_core::model::{
    BASE36_ALPHABET, LevelOutcome, ReportPayload, SessionId, SessionLog, SessionLogError,
    SessionReport, TaskAttempt,
};
use storage::repository::BacklogRepository;

use crate::Clock;
use crate::config::ReporterConfig;
use crate::delivery::{DeliveryOutcome, deliver};
use crate::sinks::{DeliverySink, HostBridges};

/// What `submit_report` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The session was never initialized; nothing was sent or stored.
    Skipped,
    Submitted(SubmittedReport),
}

impl SubmitOutcome {
    #[must_use]
    pub fn submitted(&self) -> Option<&SubmittedReport> {
        match self {
            Self::Submitted(report) => Some(report),
            Self::Skipped => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedReport {
    pub payload: ReportPayload,
    pub delivery: DeliveryOutcome,
    /// Whether the payload made it into the backlog.
    pub persisted: bool,
}

/// Accumulates telemetry for one play session and submits it as a single report.
///
/// Construct one per process and share it by `Arc`. None of the methods fail:
/// calls made before `initialize`, or naming a level that was never started, are
/// logged and ignored so telemetry can never interrupt gameplay.
pub struct SessionReporter {
    clock: Clock,
    config: ReporterConfig,
    sinks: Vec<Arc<dyn DeliverySink>>,
    backlog: Arc<dyn BacklogRepository>,
    log: Mutex<SessionLog>,
}

impl SessionReporter {
    #[must_use]
    pub fn new(
        clock: Clock,
        config: ReporterConfig,
        sinks: Vec<Arc<dyn DeliverySink>>,
        backlog: Arc<dyn BacklogRepository>,
    ) -> Self {
        Self {
            clock,
            config,
            sinks,
            backlog,
            log: Mutex::new(SessionLog::new()),
        }
    }

    /// Build a reporter delivering through the standard channels backed by `bridges`.
    #[must_use]
    pub fn with_bridges(
        clock: Clock,
        config: ReporterConfig,
        bridges: HostBridges,
        backlog: Arc<dyn BacklogRepository>,
    ) -> Self {
        let sinks = bridges.into_sinks(&config);
        Self::new(clock, config, sinks, backlog)
    }

    #[must_use]
    pub fn backlog_key(&self) -> &str {
        &self.config.backlog_key
    }

    /// Start a new session. Safe to call repeatedly; each call discards the previous
    /// session's metrics and levels.
    pub fn initialize(&self, game_id: impl Into<String>, session_name: impl Into<String>) {
        let game_id = game_id.into();
        let session_name = session_name.into();
        debug!(game_id = %game_id, session_name = %session_name, "session initialized");
        self.lock().initialize(game_id, session_name);
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lock().is_initialized()
    }

    /// Use `id` instead of a generated id when this session is submitted.
    pub fn set_session_id(&self, id: SessionId) {
        let result = self.lock().set_session_id(id);
        ignore_rejected("set_session_id", result);
    }

    pub fn add_metric(&self, key: impl Into<String>, value: impl Display) {
        let result = self.lock().add_metric(key, value);
        ignore_rejected("add_metric", result);
    }

    pub fn start_level(&self, level_id: impl Into<String>) {
        let result = self.lock().start_level(level_id);
        ignore_rejected("start_level", result);
    }

    /// Record the outcome of the most recently started level with this id.
    pub fn end_level(&self, level_id: &str, successful: bool, time_taken_ms: u64, xp_earned: i64) {
        let outcome = LevelOutcome {
            successful,
            time_taken_ms,
            xp_earned,
        };
        let result = self.lock().end_level(level_id, outcome);
        ignore_rejected("end_level", result);
    }

    /// Append a task to the most recently started level with this id. The task is
    /// successful when `choice_made` equals `correct_choice`.
    #[allow(clippy::too_many_arguments)]
    pub fn record_task(
        &self,
        level_id: &str,
        task_id: impl Into<String>,
        question: impl Into<String>,
        correct_choice: impl Into<String>,
        choice_made: impl Into<String>,
        time_taken_ms: u64,
        xp_earned: i64,
    ) {
        let attempt = TaskAttempt {
            task_id: task_id.into(),
            question: question.into(),
            correct_choice: correct_choice.into(),
            choice_made: choice_made.into(),
            time_taken_ms,
            xp_earned,
        };
        let result = self.lock().record_task(level_id, attempt);
        ignore_rejected("record_task", result);
    }

    /// Independent copy of everything accumulated so far.
    #[must_use]
    pub fn get_report(&self) -> SessionReport {
        self.lock().snapshot()
    }

    /// Clear metrics and levels. The session identity is kept.
    pub fn reset(&self) {
        self.lock().reset();
        debug!("session data reset");
    }

    /// Build the report payload, offer it to every delivery sink, then append it to
    /// the backlog.
    ///
    /// Never fails. Delivery and persistence problems are logged and reflected in
    /// the returned `SubmitOutcome`.
    pub async fn submit_report(&self) -> SubmitOutcome {
        let report = {
            let log = self.lock();
            if !log.is_initialized() {
                warn!(
                    operation = "submit_report",
                    error = %SessionLogError::NotInitialized,
                    "telemetry call ignored"
                );
                return SubmitOutcome::Skipped;
            }
            log.snapshot()
        };

        let now = self.clock.now();
        let mut payload = ReportPayload::from_report(&report);
        let session_id = payload
            .ensure_session_id(|| generate_session_id(now))
            .clone();
        payload.ensure_timestamp(now);

        info!(
            game_id = %payload.game_id,
            session_name = %payload.name,
            session_id = %session_id,
            xp_total = payload.xp_total,
            levels = payload.diagnostics.levels.len(),
            tasks = report.task_count(),
            metrics = payload.raw_data.len(),
            "submitting session report"
        );

        let delivery = deliver(&self.sinks, &payload);

        let persisted = match self
            .backlog
            .append_pending(&self.config.backlog_key, &payload, self.config.backlog_limit)
            .await
        {
            Ok(backlog_len) => {
                debug!(session_id = %session_id, backlog_len, "session payload stored");
                true
            }
            Err(err) => {
                debug!(session_id = %session_id, error = %err, "failed to store session payload");
                false
            }
        };

        SubmitOutcome::Submitted(SubmittedReport {
            payload,
            delivery,
            persisted,
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn ignore_rejected(operation: &'static str, result: Result<(), SessionLogError>) {
    if let Err(err) = result {
        warn!(operation, error = %err, "telemetry call ignored");
    }
}

fn generate_session_id(now: DateTime<Utc>) -> SessionId {
    let mut rng = rand::rng();
    SessionId::generate(now.timestamp_millis(), || {
        rng.random_range(0..BASE36_ALPHABET.len())
    })
}
