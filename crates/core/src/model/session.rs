use std::fmt::Display;

use thiserror::Error;

use crate::model::report::sum_level_xp;
use crate::model::{
    LevelOutcome, LevelRecord, Metric, SessionId, SessionReport, TaskAttempt, TaskRecord,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionLogError {
    #[error("session has not been initialized")]
    NotInitialized,

    #[error("no started level with id {level_id:?}")]
    LevelNotFound { level_id: String },
}

/// Who the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    game_id: String,
    session_name: String,
}

impl SessionIdentity {
    #[must_use]
    pub fn new(game_id: impl Into<String>, session_name: impl Into<String>) -> Self {
        Self {
            game_id: game_id.into(),
            session_name: session_name.into(),
        }
    }

    #[must_use]
    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    #[must_use]
    pub fn session_name(&self) -> &str {
        &self.session_name
    }
}

/// In-memory accumulator for one play session.
///
/// Uninitialized until `initialize` is called; every other mutation is rejected
/// with `SessionLogError::NotInitialized` before that. Levels are matched
/// newest-first, so when a level id is started twice the later record wins.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    identity: Option<SessionIdentity>,
    session_id: Option<SessionId>,
    metrics: Vec<Metric>,
    levels: Vec<LevelRecord>,
}

impl SessionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session, discarding anything accumulated so far.
    pub fn initialize(&mut self, game_id: impl Into<String>, session_name: impl Into<String>) {
        self.identity = Some(SessionIdentity::new(game_id, session_name));
        self.session_id = None;
        self.metrics.clear();
        self.levels.clear();
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.identity.is_some()
    }

    #[must_use]
    pub fn identity(&self) -> Option<&SessionIdentity> {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Preset the id used when this session is submitted.
    ///
    /// # Errors
    ///
    /// Returns `SessionLogError::NotInitialized` before `initialize`.
    pub fn set_session_id(&mut self, id: SessionId) -> Result<(), SessionLogError> {
        self.ensure_initialized()?;
        self.session_id = Some(id);
        Ok(())
    }

    /// Append a metric, storing the value's textual form.
    ///
    /// # Errors
    ///
    /// Returns `SessionLogError::NotInitialized` before `initialize`.
    pub fn add_metric(
        &mut self,
        key: impl Into<String>,
        value: impl Display,
    ) -> Result<(), SessionLogError> {
        self.ensure_initialized()?;
        self.metrics.push(Metric::new(key, value));
        Ok(())
    }

    /// Append a fresh, zeroed level record. Duplicate ids are allowed.
    ///
    /// # Errors
    ///
    /// Returns `SessionLogError::NotInitialized` before `initialize`.
    pub fn start_level(&mut self, level_id: impl Into<String>) -> Result<(), SessionLogError> {
        self.ensure_initialized()?;
        self.levels.push(LevelRecord::start(level_id));
        Ok(())
    }

    /// Write the outcome onto the most recently started level with this id.
    ///
    /// # Errors
    ///
    /// Returns `SessionLogError::NotInitialized` before `initialize`, or
    /// `SessionLogError::LevelNotFound` if no level with this id was started.
    pub fn end_level(
        &mut self,
        level_id: &str,
        outcome: LevelOutcome,
    ) -> Result<(), SessionLogError> {
        self.latest_level_mut(level_id)?.apply_outcome(outcome);
        Ok(())
    }

    /// Append a task to the most recently started level with this id.
    ///
    /// # Errors
    ///
    /// Returns `SessionLogError::NotInitialized` before `initialize`, or
    /// `SessionLogError::LevelNotFound` if no level with this id was started.
    pub fn record_task(
        &mut self,
        level_id: &str,
        attempt: TaskAttempt,
    ) -> Result<(), SessionLogError> {
        self.latest_level_mut(level_id)?
            .push_task(TaskRecord::from_attempt(attempt));
        Ok(())
    }

    /// Total XP across all levels. Derived on every call so it cannot drift from
    /// the level records.
    #[must_use]
    pub fn xp_total(&self) -> i64 {
        sum_level_xp(&self.levels)
    }

    #[must_use]
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }

    #[must_use]
    pub fn levels(&self) -> &[LevelRecord] {
        &self.levels
    }

    /// Deep copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionReport {
        let (game_id, session_name) = self
            .identity
            .as_ref()
            .map(|id| (id.game_id.clone(), id.session_name.clone()))
            .unwrap_or_default();

        let mut report = SessionReport {
            game_id,
            session_name,
            session_id: self.session_id.clone(),
            xp_total: 0,
            metrics: self.metrics.clone(),
            levels: self.levels.clone(),
        };
        report.xp_total = report.level_xp_sum();
        report
    }

    /// Drop metrics and levels but keep the session identity.
    pub fn reset(&mut self) {
        self.metrics.clear();
        self.levels.clear();
    }

    fn ensure_initialized(&self) -> Result<(), SessionLogError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(SessionLogError::NotInitialized)
        }
    }

    fn latest_level_mut(&mut self, level_id: &str) -> Result<&mut LevelRecord, SessionLogError> {
        self.ensure_initialized()?;
        self.levels
            .iter_mut()
            .rev()
            .find(|level| level.level_id() == level_id)
            .ok_or_else(|| SessionLogError::LevelNotFound {
                level_id: level_id.to_owned(),
            })
    }
}
