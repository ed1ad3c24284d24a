use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of base36 characters following the millisecond prefix.
pub const SESSION_SUFFIX_LEN: usize = 9;

/// Alphabet used for the random session suffix.
pub const BASE36_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// ─── Errors ────────────────────────────────────────────────────────────────────

/// Error type for parsing a `SessionId` from text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseSessionIdError {
    #[error("session id is missing the '-' separator")]
    MissingSeparator,

    #[error("invalid millisecond prefix: {0:?}")]
    InvalidMillis(String),

    #[error("suffix must be {SESSION_SUFFIX_LEN} lowercase base36 characters, got {0:?}")]
    InvalidSuffix(String),
}

// ─── Session Id ────────────────────────────────────────────────────────────────

/// Identifier assigned to a submitted session: `<epoch-millis>-<9 base36 chars>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId {
    epoch_millis: i64,
    suffix: String,
}

impl SessionId {
    /// Build an id from its two parts.
    ///
    /// # Errors
    ///
    /// Returns `ParseSessionIdError` if the millis are negative or the suffix is not
    /// exactly nine lowercase base36 characters.
    pub fn from_parts(epoch_millis: i64, suffix: &str) -> Result<Self, ParseSessionIdError> {
        if epoch_millis < 0 {
            return Err(ParseSessionIdError::InvalidMillis(epoch_millis.to_string()));
        }
        let valid_suffix = suffix.len() == SESSION_SUFFIX_LEN
            && suffix.bytes().all(|b| BASE36_ALPHABET.contains(&b));
        if !valid_suffix {
            return Err(ParseSessionIdError::InvalidSuffix(suffix.to_owned()));
        }

        Ok(Self {
            epoch_millis,
            suffix: suffix.to_owned(),
        })
    }

    /// Build an id from a millisecond timestamp and a source of alphabet indices.
    ///
    /// `next_index` is called once per suffix character; values wrap modulo 36.
    /// Negative timestamps are clamped to zero.
    #[must_use]
    pub fn generate(epoch_millis: i64, mut next_index: impl FnMut() -> usize) -> Self {
        let suffix = (0..SESSION_SUFFIX_LEN)
            .map(|_| char::from(BASE36_ALPHABET[next_index() % BASE36_ALPHABET.len()]))
            .collect();
        Self {
            epoch_millis: epoch_millis.max(0),
            suffix,
        }
    }

    #[must_use]
    pub fn epoch_millis(&self) -> i64 {
        self.epoch_millis
    }

    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.epoch_millis, self.suffix)
    }
}

impl FromStr for SessionId {
    type Err = ParseSessionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (millis, suffix) = s
            .split_once('-')
            .ok_or(ParseSessionIdError::MissingSeparator)?;
        if millis.is_empty() || !millis.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseSessionIdError::InvalidMillis(millis.to_owned()));
        }
        let epoch_millis = millis
            .parse::<i64>()
            .map_err(|_| ParseSessionIdError::InvalidMillis(millis.to_owned()))?;
        Self::from_parts(epoch_millis, suffix)
    }
}

impl TryFrom<String> for SessionId {
    type Error = ParseSessionIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.to_string()
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
