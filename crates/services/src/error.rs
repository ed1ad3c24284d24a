//! Shared error types for the services crate.

use thiserror::Error;

/// Failure reported by a host-provided bridge object.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct BridgeError(pub String);

impl BridgeError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Outcome of a single delivery sink attempt that did not succeed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SinkError {
    #[error("channel is not available in this environment")]
    Unavailable,
    #[error("channel rejected the payload: {0}")]
    Failed(String),
    #[error("payload could not be encoded: {0}")]
    Serialization(String),
    #[error("channel panicked during delivery")]
    Panicked,
}

impl From<BridgeError> for SinkError {
    fn from(err: BridgeError) -> Self {
        Self::Failed(err.0)
    }
}

impl From<serde_json::Error> for SinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors emitted while validating `ReporterConfig`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReporterConfigError {
    #[error("target origin must not be empty")]
    EmptyTargetOrigin,
    #[error("backlog key must not be empty")]
    EmptyBacklogKey,
}
