#![forbid(unsafe_code)]

pub mod config;
pub mod delivery;
pub mod error;
pub mod reporter;
pub mod sinks;

pub use playtrack_core::Clock;

pub use config::ReporterConfig;
pub use delivery::{DeliveryOutcome, SinkAttempt, deliver};
pub use error::{BridgeError, ReporterConfigError, SinkError};
pub use reporter::{SessionReporter, SubmitOutcome, SubmittedReport};
pub use sinks::{
    DeliverySink, HostBridges, HostMessageHandler, NativeAnalyticsBridge, ParentFrame,
};
