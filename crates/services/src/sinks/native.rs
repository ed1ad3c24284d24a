use std::sync::Arc;

use playtrack_core::model::ReportPayload;

use super::{DeliverySink, NativeAnalyticsBridge};
use crate::error::SinkError;

/// Passes the payload object straight to the native analytics bridge.
pub struct NativeAnalyticsSink {
    bridge: Option<Arc<dyn NativeAnalyticsBridge>>,
}

impl NativeAnalyticsSink {
    #[must_use]
    pub fn new(bridge: Option<Arc<dyn NativeAnalyticsBridge>>) -> Self {
        Self { bridge }
    }
}

impl DeliverySink for NativeAnalyticsSink {
    fn name(&self) -> &'static str {
        "native_analytics"
    }

    fn attempt(&self, payload: &ReportPayload) -> Result<(), SinkError> {
        let bridge = self.bridge.as_ref().ok_or(SinkError::Unavailable)?;
        bridge.track_session(payload)?;
        Ok(())
    }
}
