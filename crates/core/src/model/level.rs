//
// ─── TASK ─────────────────────────────────────────────────────────────────────
//

/// Input for a single scored task within a level (for example a quiz question).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskAttempt {
    pub task_id: String,
    pub question: String,
    pub correct_choice: String,
    pub choice_made: String,
    pub time_taken_ms: u64,
    pub xp_earned: i64,
}

/// Immutable record of a task outcome, appended to its parent level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    task_id: String,
    question: String,
    correct_choice: String,
    choice_made: String,
    successful: bool,
    time_taken_ms: u64,
    xp_earned: i64,
}

impl TaskRecord {
    /// Build a record from an attempt. Success is exact equality of the two choices.
    #[must_use]
    pub fn from_attempt(attempt: TaskAttempt) -> Self {
        let successful = attempt.correct_choice == attempt.choice_made;
        Self {
            task_id: attempt.task_id,
            question: attempt.question,
            correct_choice: attempt.correct_choice,
            choice_made: attempt.choice_made,
            successful,
            time_taken_ms: attempt.time_taken_ms,
            xp_earned: attempt.xp_earned,
        }
    }

    #[must_use]
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    #[must_use]
    pub fn question(&self) -> &str {
        &self.question
    }

    #[must_use]
    pub fn correct_choice(&self) -> &str {
        &self.correct_choice
    }

    #[must_use]
    pub fn choice_made(&self) -> &str {
        &self.choice_made
    }

    #[must_use]
    pub fn successful(&self) -> bool {
        self.successful
    }

    #[must_use]
    pub fn time_taken_ms(&self) -> u64 {
        self.time_taken_ms
    }

    #[must_use]
    pub fn xp_earned(&self) -> i64 {
        self.xp_earned
    }
}

//
// ─── LEVEL ────────────────────────────────────────────────────────────────────
//

/// Result fields written onto a level when it ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelOutcome {
    pub successful: bool,
    pub time_taken_ms: u64,
    pub xp_earned: i64,
}

/// One attempt at a level. Starts zeroed and is completed in place by `apply_outcome`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelRecord {
    level_id: String,
    successful: bool,
    time_taken_ms: u64,
    xp_earned: i64,
    tasks: Vec<TaskRecord>,
}

impl LevelRecord {
    #[must_use]
    pub fn start(level_id: impl Into<String>) -> Self {
        Self {
            level_id: level_id.into(),
            successful: false,
            time_taken_ms: 0,
            xp_earned: 0,
            tasks: Vec::new(),
        }
    }

    /// Overwrite the outcome fields. Tasks are left untouched.
    pub fn apply_outcome(&mut self, outcome: LevelOutcome) {
        self.successful = outcome.successful;
        self.time_taken_ms = outcome.time_taken_ms;
        self.xp_earned = outcome.xp_earned;
    }

    pub fn push_task(&mut self, task: TaskRecord) {
        self.tasks.push(task);
    }

    #[must_use]
    pub fn level_id(&self) -> &str {
        &self.level_id
    }

    #[must_use]
    pub fn successful(&self) -> bool {
        self.successful
    }

    #[must_use]
    pub fn time_taken_ms(&self) -> u64 {
        self.time_taken_ms
    }

    #[must_use]
    pub fn xp_earned(&self) -> i64 {
        self.xp_earned
    }

    /// Reserved by the report format; never set.
    #[must_use]
    pub fn time_direction(&self) -> bool {
        false
    }

    #[must_use]
    pub fn tasks(&self) -> &[TaskRecord] {
        &self.tasks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(correct: &str, made: &str) -> TaskAttempt {
        TaskAttempt {
            task_id: "t1".into(),
            question: "Q".into(),
            correct_choice: correct.into(),
            choice_made: made.into(),
            time_taken_ms: 100,
            xp_earned: 10,
        }
    }

    #[test]
    fn task_success_is_choice_equality() {
        assert!(TaskRecord::from_attempt(attempt("x", "x")).successful());
        assert!(!TaskRecord::from_attempt(attempt("x", "y")).successful());
        // comparison is exact, including case
        assert!(!TaskRecord::from_attempt(attempt("x", "X")).successful());
    }

    #[test]
    fn new_level_is_zeroed() {
        let level = LevelRecord::start("L1");
        assert_eq!(level.level_id(), "L1");
        assert!(!level.successful());
        assert_eq!(level.time_taken_ms(), 0);
        assert_eq!(level.xp_earned(), 0);
        assert!(!level.time_direction());
        assert!(level.tasks().is_empty());
    }

    #[test]
    fn outcome_keeps_tasks() {
        let mut level = LevelRecord::start("L1");
        level.push_task(TaskRecord::from_attempt(attempt("a", "a")));
        level.apply_outcome(LevelOutcome {
            successful: true,
            time_taken_ms: 1000,
            xp_earned: 50,
        });

        assert!(level.successful());
        assert_eq!(level.time_taken_ms(), 1000);
        assert_eq!(level.xp_earned(), 50);
        assert_eq!(level.tasks().len(), 1);
    }
}
