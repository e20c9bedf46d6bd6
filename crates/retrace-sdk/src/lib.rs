//! Retrace SDK
//!
//! This crate provides a high-level SDK for using Retrace programmatically:
//! run instrumented work inside managed sessions, replay earlier sessions
//! deterministically, and score the captured records with declarative
//! metric suites.
//!
//! # API Versioning
//!
//! The SDK follows semantic versioning (SemVer 2.0.0) for its public API.
//! Version information and compatibility checks are available through the
//! [`version`] module. The SDK maintains backward compatibility within the
//! same MAJOR version; callers can check compatibility using
//! [`version::is_compatible`].
//!
//! # Example
//!
//! ```no_run
//! use retrace_sdk::{RetraceClient, RunOptions};
//!
//! # async fn demo() -> retrace_sdk::RetraceResult<()> {
//! let client = RetraceClient::in_memory("demo");
//! let run = client
//!     .run_session(RunOptions::new(), async {
//!         // instrumented application code
//!     })
//!     .await?;
//! println!("captured {} records", run.records.len());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod http;
pub mod version;

pub use client::{EvalSelector, RetraceClient, RunOptions, SessionRun};
pub use http::HttpStore;

// Re-export commonly used types from core
pub use retrace_core::{
    config::RetraceConfig,
    error::{ReplayError, RetraceError, RetraceResult},
    eval::{EvalConfig, EvaluationResult, Evaluator, MetricConfig},
    intercept::{CallSpec, CaptureMode, Instrumentor, capture_var},
    record::CallRecord,
    session::{ReplaySource, Session, SessionManager, SessionOptions},
    store::{VersionSelector, VersionedConfig},
};

// Re-export version constants for convenience
pub use version::{API_VERSION, MIN_SUPPORTED_VERSION};
