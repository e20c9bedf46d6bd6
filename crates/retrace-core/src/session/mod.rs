//! Session lifecycle, task-scoped context propagation and record collection

mod collector;
mod context;
mod manager;

pub use collector::{CollectorSummary, RecordCollector};
pub use context::{Session, current};
pub use manager::{ReplaySource, SessionManager, SessionOptions};
