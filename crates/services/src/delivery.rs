//! Best-effort fan-out of a payload over every configured sink.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use playtrack_core::model::ReportPayload;

use crate::error::SinkError;
use crate::sinks::DeliverySink;

/// Result of one sink attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkAttempt {
    pub sink: &'static str,
    pub result: Result<(), SinkError>,
}

/// Per-sink results of a delivery, in attempt order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryOutcome {
    attempts: Vec<SinkAttempt>,
}

impl DeliveryOutcome {
    #[must_use]
    pub fn attempts(&self) -> &[SinkAttempt] {
        &self.attempts
    }

    /// Names of the sinks that accepted the payload.
    #[must_use]
    pub fn succeeded(&self) -> Vec<&'static str> {
        self.attempts
            .iter()
            .filter(|attempt| attempt.result.is_ok())
            .map(|attempt| attempt.sink)
            .collect()
    }

    /// True if at least one sink accepted the payload.
    #[must_use]
    pub fn is_delivered(&self) -> bool {
        self.attempts.iter().any(|attempt| attempt.result.is_ok())
    }
}

/// Offer `payload` to every sink in order.
///
/// Sinks are isolated from each other: an error or a panic in one sink is recorded
/// and the next sink is still tried. Several sinks may accept the same payload.
/// When none does, the payload is logged so it can be recovered by hand.
pub fn deliver(sinks: &[Arc<dyn DeliverySink>], payload: &ReportPayload) -> DeliveryOutcome {
    let mut attempts = Vec::with_capacity(sinks.len());

    for sink in sinks {
        let result = panic::catch_unwind(AssertUnwindSafe(|| sink.attempt(payload)))
            .unwrap_or(Err(SinkError::Panicked));

        match &result {
            Ok(()) => tracing::debug!(sink = sink.name(), "session payload delivered"),
            Err(err) => tracing::debug!(sink = sink.name(), error = %err, "delivery attempt failed"),
        }

        attempts.push(SinkAttempt {
            sink: sink.name(),
            result,
        });
    }

    let outcome = DeliveryOutcome { attempts };
    if !outcome.is_delivered() {
        match serde_json::to_string(payload) {
            Ok(json) => tracing::warn!(
                payload = %json,
                "no delivery channel accepted the session payload"
            ),
            Err(err) => tracing::warn!(
                error = %err,
                "no delivery channel accepted the session payload and it could not be encoded"
            ),
        }
    }

    outcome
}
