//! Delivery channels a session report can be handed to.
//!
//! Each channel wraps an optional, host-provided bridge. A channel whose bridge is
//! absent still takes part in delivery and reports `SinkError::Unavailable`.

use std::sync::Arc;

use playtrack_core::model::ReportPayload;

use crate::config::ReporterConfig;
use crate::error::{BridgeError, SinkError};

mod host;
mod native;
mod parent;

pub use host::HostMessageSink;
pub use native::NativeAnalyticsSink;
pub use parent::ParentFrameSink;

/// A channel that accepts the final report payload.
pub trait DeliverySink: Send + Sync {
    /// Short, stable name used in logs and delivery outcomes.
    fn name(&self) -> &'static str;

    /// Hand the payload to the channel.
    ///
    /// # Errors
    ///
    /// Returns `SinkError::Unavailable` when the channel is missing, or another
    /// `SinkError` when it failed.
    fn attempt(&self, payload: &ReportPayload) -> Result<(), SinkError>;
}

/// Native analytics object exposed by the runtime.
pub trait NativeAnalyticsBridge: Send + Sync {
    /// # Errors
    ///
    /// Returns `BridgeError` if the bridge rejected the session.
    fn track_session(&self, payload: &ReportPayload) -> Result<(), BridgeError>;
}

/// Message handler of an embedding host application (for example a native webview wrapper).
pub trait HostMessageHandler: Send + Sync {
    /// # Errors
    ///
    /// Returns `BridgeError` if the host rejected the message.
    fn post_message(&self, message: &str) -> Result<(), BridgeError>;
}

/// Messaging primitive of the enclosing frame.
pub trait ParentFrame: Send + Sync {
    /// # Errors
    ///
    /// Returns `BridgeError` if the message could not be posted.
    fn post_message(
        &self,
        message: &serde_json::Value,
        target_origin: &str,
    ) -> Result<(), BridgeError>;
}

/// The bridges available in the current environment.
#[derive(Clone, Default)]
pub struct HostBridges {
    pub native: Option<Arc<dyn NativeAnalyticsBridge>>,
    pub host: Option<Arc<dyn HostMessageHandler>>,
    pub parent: Option<Arc<dyn ParentFrame>>,
}

impl HostBridges {
    /// No bridges at all; every channel reports unavailable.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_native(mut self, bridge: Arc<dyn NativeAnalyticsBridge>) -> Self {
        self.native = Some(bridge);
        self
    }

    #[must_use]
    pub fn with_host(mut self, handler: Arc<dyn HostMessageHandler>) -> Self {
        self.host = Some(handler);
        self
    }

    #[must_use]
    pub fn with_parent(mut self, frame: Arc<dyn ParentFrame>) -> Self {
        self.parent = Some(frame);
        self
    }

    /// Build the standard channel list: native analytics, host message, parent frame.
    #[must_use]
    pub fn into_sinks(self, config: &ReporterConfig) -> Vec<Arc<dyn DeliverySink>> {
        let native: Arc<dyn DeliverySink> = Arc::new(NativeAnalyticsSink::new(self.native));
        let host: Arc<dyn DeliverySink> = Arc::new(HostMessageSink::new(self.host));
        let parent: Arc<dyn DeliverySink> = Arc::new(ParentFrameSink::new(
            self.parent,
            config.target_origin.clone(),
        ));
        vec![native, host, parent]
    }
}
