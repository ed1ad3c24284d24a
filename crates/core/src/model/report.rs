use crate::model::{LevelRecord, Metric, SessionId};

/// Point-in-time copy of an accumulated session.
///
/// Owns all of its data: changing a report never reaches back into the session
/// it was taken from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionReport {
    /// Empty until the session has been initialized.
    pub game_id: String,
    /// Empty until the session has been initialized.
    pub session_name: String,
    pub session_id: Option<SessionId>,
    pub xp_total: i64,
    pub metrics: Vec<Metric>,
    pub levels: Vec<LevelRecord>,
}

impl SessionReport {
    /// Sum of level XP. Always equal to `xp_total` for reports built by `SessionLog`.
    #[must_use]
    pub fn level_xp_sum(&self) -> i64 {
        sum_level_xp(&self.levels)
    }

    #[must_use]
    pub fn task_count(&self) -> usize {
        self.levels.iter().map(|level| level.tasks().len()).sum()
    }
}

/// Saturating sum of `xp_earned` over `levels`.
pub(crate) fn sum_level_xp(levels: &[LevelRecord]) -> i64 {
    levels
        .iter()
        .fold(0_i64, |acc, level| acc.saturating_add(level.xp_earned()))
}
