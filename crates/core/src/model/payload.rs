//! Wire shape of a submitted session, as consumed by the analytics bridges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{LevelRecord, Metric, SessionId, SessionReport, TaskRecord};
use crate::time::iso_timestamp;

/// Literal value of `options` on every task; choices are not reported.
pub const TASK_OPTIONS_PLACEHOLDER: &str = "[]";

/// Consolidated report payload.
///
/// The XP total is mirrored under four names for downstream consumers that read
/// different fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub game_id: String,
    pub name: String,
    pub xp_earned_total: i64,
    pub xp_earned: i64,
    pub xp_total: i64,
    pub best_xp: i64,
    pub raw_data: Vec<Metric>,
    pub diagnostics: Diagnostics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub levels: Vec<LevelPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelPayload {
    pub level_id: String,
    pub successful: bool,
    pub time_taken: u64,
    pub time_direction: bool,
    pub xp_earned: i64,
    pub tasks: Vec<TaskPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub task_id: String,
    pub question: String,
    pub options: String,
    pub correct_choice: String,
    pub choice_made: String,
    pub successful: bool,
    pub time_taken: u64,
    pub xp_earned: i64,
}

impl ReportPayload {
    /// Build the payload for a report. `session_id` carries over if the session had
    /// one preset; `timestamp` starts empty.
    #[must_use]
    pub fn from_report(report: &SessionReport) -> Self {
        let xp = report.xp_total;
        Self {
            game_id: report.game_id.clone(),
            name: report.session_name.clone(),
            xp_earned_total: xp,
            xp_earned: xp,
            xp_total: xp,
            best_xp: xp,
            raw_data: report.metrics.clone(),
            diagnostics: Diagnostics {
                levels: report.levels.iter().map(LevelPayload::from).collect(),
            },
            session_id: report.session_id.clone(),
            timestamp: None,
        }
    }

    /// Assign a session id unless one is already present, and return the id in use.
    pub fn ensure_session_id(&mut self, generate: impl FnOnce() -> SessionId) -> &SessionId {
        self.session_id.get_or_insert_with(generate)
    }

    /// Assign an ISO-8601 timestamp unless one is already present.
    pub fn ensure_timestamp(&mut self, at: DateTime<Utc>) -> &str {
        self.timestamp.get_or_insert_with(|| iso_timestamp(at))
    }
}

impl From<&LevelRecord> for LevelPayload {
    fn from(level: &LevelRecord) -> Self {
        Self {
            level_id: level.level_id().to_owned(),
            successful: level.successful(),
            time_taken: level.time_taken_ms(),
            time_direction: level.time_direction(),
            xp_earned: level.xp_earned(),
            tasks: level.tasks().iter().map(TaskPayload::from).collect(),
        }
    }
}

impl From<&TaskRecord> for TaskPayload {
    fn from(task: &TaskRecord) -> Self {
        Self {
            task_id: task.task_id().to_owned(),
            question: task.question().to_owned(),
            options: TASK_OPTIONS_PLACEHOLDER.to_owned(),
            correct_choice: task.correct_choice().to_owned(),
            choice_made: task.choice_made().to_owned(),
            successful: task.successful(),
            time_taken: task.time_taken_ms(),
            xp_earned: task.xp_earned(),
        }
    }
}
