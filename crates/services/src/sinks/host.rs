use std::sync::Arc;

use playtrack_core::model::ReportPayload;

use super::{DeliverySink, HostMessageHandler};
use crate::error::SinkError;

/// Posts the payload as JSON text to the embedding host.
pub struct HostMessageSink {
    handler: Option<Arc<dyn HostMessageHandler>>,
}

impl HostMessageSink {
    #[must_use]
    pub fn new(handler: Option<Arc<dyn HostMessageHandler>>) -> Self {
        Self { handler }
    }
}

impl DeliverySink for HostMessageSink {
    fn name(&self) -> &'static str {
        "host_message"
    }

    fn attempt(&self, payload: &ReportPayload) -> Result<(), SinkError> {
        let handler = self.handler.as_ref().ok_or(SinkError::Unavailable)?;
        let message = serde_json::to_string(payload)?;
        handler.post_message(&message)?;
        Ok(())
    }
}
