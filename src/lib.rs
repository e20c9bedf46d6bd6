//! Retrace
//!
//! Record, replay, and evaluate call footprints without touching
//! application logic. This crate re-exports the SDK surface and owns the
//! one piece neither library crate should: installing the global tracing
//! subscriber.
//!
//! # Quick start
//!
//! ```no_run
//! use retrace::{CallSpec, CaptureMode, ReplayError, RetraceClient, RunOptions};
//!
//! # async fn demo() -> retrace::RetraceResult<()> {
//! let client = RetraceClient::in_memory("demo");
//! let spec = CallSpec::new("Svc.compute").param("x", CaptureMode::TraceAndReplay);
//!
//! let run = client
//!     .run_session(RunOptions::new().with_session("baseline"), async move {
//!         spec.invoke((100i64,), |(x,)| async move { Ok::<_, ReplayError>(x + 1) })
//!             .await
//!     })
//!     .await?;
//! assert_eq!(run.records.len(), 1);
//! # Ok(())
//! # }
//! ```

pub use retrace_core::config::LoggingConfig;
pub use retrace_sdk::{
    API_VERSION, CallRecord, CallSpec, CaptureMode, EvalConfig, EvalSelector, EvaluationResult,
    Evaluator, HttpStore, Instrumentor, MIN_SUPPORTED_VERSION, MetricConfig, ReplayError,
    ReplaySource, RetraceClient, RetraceConfig, RetraceError, RetraceResult, RunOptions, Session,
    SessionManager, SessionOptions, SessionRun, VersionSelector, VersionedConfig, capture_var,
};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber according to a [`LoggingConfig`].
///
/// `RUST_LOG` takes precedence over the configured level. Fails when a
/// subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> RetraceResult<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.clone()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match config.format.as_str() {
        "json" => builder.json().try_init(),
        "compact" => builder.compact().try_init(),
        _ => builder.try_init(),
    };
    installed.map_err(|e| RetraceError::config(format!("failed to install log subscriber: {}", e)))
}

/// [`init_logging`] with the default configuration (`info`, pretty output)
pub fn init_default_logging() -> RetraceResult<()> {
    init_logging(&LoggingConfig::default())
}
