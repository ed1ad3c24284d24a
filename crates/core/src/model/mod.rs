mod ids;
mod level;
mod metric;
pub mod payload;
mod report;
mod session;

pub use ids::{BASE36_ALPHABET, ParseSessionIdError, SESSION_SUFFIX_LEN, SessionId};
pub use level::{LevelOutcome, LevelRecord, TaskAttempt, TaskRecord};
pub use metric::Metric;
pub use payload::{Diagnostics, LevelPayload, ReportPayload, TaskPayload};
pub use report::SessionReport;
pub use session::{SessionIdentity, SessionLog, SessionLogError};
