use std::sync::Arc;

use playtrack_core::model::ReportPayload;

use super::{DeliverySink, ParentFrame};
use crate::error::SinkError;

/// Posts the payload to the parent frame, restricted to `target_origin`.
pub struct ParentFrameSink {
    frame: Option<Arc<dyn ParentFrame>>,
    target_origin: String,
}

impl ParentFrameSink {
    #[must_use]
    pub fn new(frame: Option<Arc<dyn ParentFrame>>, target_origin: String) -> Self {
        Self {
            frame,
            target_origin,
        }
    }
}

impl DeliverySink for ParentFrameSink {
    fn name(&self) -> &'static str {
        "parent_frame"
    }

    fn attempt(&self, payload: &ReportPayload) -> Result<(), SinkError> {
        let frame = self.frame.as_ref().ok_or(SinkError::Unavailable)?;
        let message = serde_json::to_value(payload)?;
        frame.post_message(&message, &self.target_origin)?;
        Ok(())
    }
}
