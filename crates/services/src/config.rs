use std::env;

use crate::error::ReporterConfigError;

/// Parent-frame origin used when none is configured.
pub const DEFAULT_TARGET_ORIGIN: &str = "*";
/// Storage key under which submitted payloads are kept.
pub const DEFAULT_BACKLOG_KEY: &str = "pendingSessions";
/// Maximum number of backlog entries kept per key.
pub const DEFAULT_BACKLOG_LIMIT: usize = 100;

pub const ENV_TARGET_ORIGIN: &str = "PLAYTRACK_TARGET_ORIGIN";
pub const ENV_BACKLOG_KEY: &str = "PLAYTRACK_BACKLOG_KEY";
pub const ENV_BACKLOG_LIMIT: &str = "PLAYTRACK_BACKLOG_LIMIT";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReporterConfig {
    /// Origin passed to the parent frame when posting a report.
    pub target_origin: String,
    pub backlog_key: String,
    /// `None` keeps every payload.
    pub backlog_limit: Option<usize>,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            target_origin: DEFAULT_TARGET_ORIGIN.into(),
            backlog_key: DEFAULT_BACKLOG_KEY.into(),
            backlog_limit: Some(DEFAULT_BACKLOG_LIMIT),
        }
    }
}

impl ReporterConfig {
    /// Read configuration from `PLAYTRACK_*` environment variables.
    ///
    /// Missing or unusable values fall back to the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_blank = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let target_origin = non_blank(ENV_TARGET_ORIGIN).unwrap_or(defaults.target_origin);
        let backlog_key = non_blank(ENV_BACKLOG_KEY).unwrap_or(defaults.backlog_key);
        let backlog_limit = match non_blank(ENV_BACKLOG_LIMIT) {
            None => defaults.backlog_limit,
            Some(raw) if raw.eq_ignore_ascii_case("none") => None,
            Some(raw) => match raw.parse::<usize>() {
                Ok(0) => None,
                Ok(limit) => Some(limit),
                Err(_) => defaults.backlog_limit,
            },
        };

        Self {
            target_origin,
            backlog_key,
            backlog_limit,
        }
    }

    /// Check that required fields are usable.
    ///
    /// # Errors
    ///
    /// Returns `ReporterConfigError` if the origin or backlog key is blank.
    pub fn validate(self) -> Result<Self, ReporterConfigError> {
        if self.target_origin.trim().is_empty() {
            return Err(ReporterConfigError::EmptyTargetOrigin);
        }
        if self.backlog_key.trim().is_empty() {
            return Err(ReporterConfigError::EmptyBacklogKey);
        }
        Ok(self)
    }

    #[must_use]
    pub fn with_target_origin(mut self, origin: impl Into<String>) -> Self {
        self.target_origin = origin.into();
        self
    }

    #[must_use]
    pub fn with_backlog_limit(mut self, limit: Option<usize>) -> Self {
        self.backlog_limit = limit;
        self
    }
}
