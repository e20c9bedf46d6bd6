//! Retrace Core Library
//!
//! This crate provides the core functionality for the Retrace system:
//! call interception and capture, session-scoped replay of historical
//! records, declarative metric evaluation, and the storage boundary they
//! all share.

pub mod config;
pub mod error;
pub mod eval;
pub mod intercept;
pub mod record;
pub mod replay;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use config::{RetraceConfig, StorageBackend, StorageConfig};
pub use error::{ReplayError, RetraceError, RetraceResult};
pub use eval::{EvalConfig, EvaluationResult, Evaluator, MetricConfig, TagContext};
pub use intercept::{CallSpec, CaptureMode, Instrumentor, ParamSpec, capture_var};
pub use record::{CallPayload, CallRecord, VarCapture};
pub use replay::{ReplayMatcher, clear_replay_set, install_replay_set};
pub use session::{Session, SessionManager, SessionOptions};
pub use store::{ConfigStore, RecordSink, RecordStore, StoreHandles, VersionSelector};
