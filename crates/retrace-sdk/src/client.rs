//! SDK client implementation

use std::sync::Arc;

use retrace_core::config::{RetraceConfig, StorageBackend, StorageConfig};
use retrace_core::error::{RetraceError, RetraceResult};
use retrace_core::eval::{EvalConfig, EvalStrategy, EvaluationResult, Evaluator, MetricConfig};
use retrace_core::record::CallRecord;
use retrace_core::session::{
    CollectorSummary, ReplaySource, Session, SessionManager, SessionOptions,
};
use retrace_core::store::{
    ConfigStore, RecordStore, StoreHandles, VersionSelector, VersionedConfig,
};

use crate::http::HttpStore;

/// SDK client for Retrace
///
/// Owns the storage backends, the session manager, and the metric
/// evaluator; every session started through [`run_session`] records into
/// the same store that [`evaluate_session`] later reads from.
///
/// [`run_session`]: RetraceClient::run_session
/// [`evaluate_session`]: RetraceClient::evaluate_session
pub struct RetraceClient {
    config: RetraceConfig,
    records: Arc<dyn RecordStore>,
    configs: Arc<dyn ConfigStore>,
    manager: SessionManager,
    evaluator: Evaluator,
}

impl RetraceClient {
    /// Create a client from the ambient configuration (config file plus
    /// `RETRACE_*` environment overrides)
    pub fn new() -> RetraceResult<Self> {
        let config = retrace_core::config::load()?;
        Self::with_config(config)
    }

    /// Create a client with an explicit configuration
    ///
    /// A configured `endpoint` selects the remote HTTP backend; otherwise
    /// records and configs live in the configured local storage.
    pub fn with_config(config: RetraceConfig) -> RetraceResult<Self> {
        config.validate()?;

        let (records, configs): (Arc<dyn RecordStore>, Arc<dyn ConfigStore>) =
            match &config.endpoint {
                Some(endpoint) => {
                    tracing::info!(endpoint = %endpoint, "using remote record service");
                    let store = Arc::new(HttpStore::new(endpoint, config.api_key.clone())?);
                    (store.clone(), store)
                }
                None => {
                    let handles = StoreHandles::open(&config.storage);
                    (handles.records, handles.configs)
                }
            };

        let manager = SessionManager::new().with_store(records.clone());
        Ok(Self {
            config,
            records,
            configs,
            manager,
            evaluator: Evaluator::new(),
        })
    }

    /// Create a client with configuration loaded from a specific file
    pub fn with_config_file<P: AsRef<std::path::Path>>(path: P) -> RetraceResult<Self> {
        let config = retrace_core::config::load_with_file(path.as_ref())?;
        Self::with_config(config)
    }

    /// A fully in-memory client for the given project, handy in tests and
    /// short-lived tools
    pub fn in_memory(project: impl Into<String>) -> Self {
        let config = RetraceConfig {
            project: project.into(),
            storage: StorageConfig {
                backend: StorageBackend::Memory,
                ..Default::default()
            },
            ..Default::default()
        };
        let handles = StoreHandles::open(&config.storage);
        let manager = SessionManager::new().with_store(handles.records.clone());
        Self {
            config,
            records: handles.records,
            configs: handles.configs,
            manager,
            evaluator: Evaluator::new(),
        }
    }

    /// Create a client for `project` over caller-provided storage backends
    ///
    /// For backends beyond the built-in memory, file and HTTP stores, e.g.
    /// a database the application already runs on.
    pub fn with_stores(
        project: impl Into<String>,
        records: Arc<dyn RecordStore>,
        configs: Arc<dyn ConfigStore>,
    ) -> Self {
        let config = RetraceConfig {
            project: project.into(),
            ..Default::default()
        };
        let manager = SessionManager::new().with_store(records.clone());
        Self {
            config,
            records,
            configs,
            manager,
            evaluator: Evaluator::new(),
        }
    }

    /// Register an additional evaluation strategy on this client
    pub fn with_strategy(mut self, strategy: Arc<dyn EvalStrategy>) -> Self {
        self.evaluator = self.evaluator.with_strategy(strategy);
        self
    }

    /// Get the current configuration
    pub fn config(&self) -> &RetraceConfig {
        &self.config
    }

    /// Validate the current configuration
    pub fn validate_config(&self) -> RetraceResult<()> {
        self.config.validate()
    }

    /// The record store backing this client
    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    /// The evaluator backing this client
    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    /// Get the current SDK API version
    pub fn api_version(&self) -> crate::version::Version {
        crate::version::API_VERSION
    }

    /// Check if a caller's version is compatible with this SDK
    pub fn is_compatible_with(&self, caller_version: &crate::version::Version) -> bool {
        crate::version::is_compatible(caller_version)
    }

    /// Start a session without running anything in it
    ///
    /// The caller is responsible for scoping work with [`Session::scope`]
    /// and for calling [`Session::end`]. Most callers want
    /// [`run_session`](RetraceClient::run_session) instead.
    pub async fn start_session(&self, options: RunOptions) -> RetraceResult<Session> {
        let mut session_options = SessionOptions::new(&self.config.project)
            .with_fetch_timeout(options.fetch_timeout.unwrap_or(self.config.fetch_timeout));
        if let Some(name) = options.session {
            session_options = session_options.with_session(name);
        }
        if let Some(source) = options.replay_from {
            session_options = session_options.with_replay_from(source);
        }
        self.manager.start_session(session_options).await
    }

    /// Run a future inside a fresh session
    ///
    /// Starts the session (bootstrapping a replay set when requested),
    /// scopes the future to it, ends the session once the future returns,
    /// and evaluates any requested metric suite over the session's records.
    pub async fn run_session<T, F>(&self, options: RunOptions, fut: F) -> RetraceResult<SessionRun<T>>
    where
        F: Future<Output = T>,
    {
        let eval = options.eval.clone();
        let session = self.start_session(options).await?;

        let output = session.scope(fut).await;
        session.end().await;

        let records = session.records();
        let summary = session.summary();
        let evaluations = match eval {
            Some(selector) => {
                let metrics = self.resolve_metrics(&selector).await?;
                self.evaluator.evaluate_all(&metrics, &records)
            }
            None => Vec::new(),
        };

        Ok(SessionRun {
            session,
            output,
            records,
            summary,
            evaluations,
        })
    }

    /// Evaluate a stored session against a metric suite
    pub async fn evaluate_session(
        &self,
        session: &str,
        selector: EvalSelector,
    ) -> RetraceResult<Vec<EvaluationResult>> {
        let metrics = self.resolve_metrics(&selector).await?;
        let records = self
            .records
            .query(&self.config.project, session, None)
            .await?;
        Ok(self.evaluator.evaluate_all(&metrics, &records))
    }

    /// Publish a metric suite as the project's next config version
    pub async fn publish_config(&self, config: &EvalConfig) -> RetraceResult<u32> {
        self.configs.put_config(&self.config.project, config).await
    }

    /// Fetch a stored config version, `None` when nothing matches
    pub async fn fetch_config(
        &self,
        selector: VersionSelector,
    ) -> RetraceResult<Option<VersionedConfig>> {
        self.configs.get_config(&self.config.project, selector).await
    }

    async fn resolve_metrics(&self, selector: &EvalSelector) -> RetraceResult<Vec<MetricConfig>> {
        match selector {
            EvalSelector::Inline(config) => Ok(config.metrics.clone()),
            EvalSelector::Latest => self.stored_metrics(VersionSelector::Latest).await,
            EvalSelector::Version(version) => {
                self.stored_metrics(VersionSelector::Exact(*version)).await
            }
        }
    }

    async fn stored_metrics(&self, selector: VersionSelector) -> RetraceResult<Vec<MetricConfig>> {
        let versioned = self
            .configs
            .get_config(&self.config.project, selector)
            .await?
            .ok_or_else(|| {
                RetraceError::not_found(format!(
                    "no metric config stored for project `{}`",
                    self.config.project
                ))
            })?;
        Ok(versioned.config.metrics)
    }
}

/// Which metric suite to evaluate with
#[derive(Debug, Clone)]
pub enum EvalSelector {
    /// The latest published config version
    Latest,
    /// A specific published config version
    Version(u32),
    /// A suite supplied by the caller, bypassing the config store
    Inline(EvalConfig),
}

/// Options for running a session
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Session name; generated when absent
    pub session: Option<String>,
    /// Bootstrap the replay set from this historical source
    pub replay_from: Option<ReplaySource>,
    /// Evaluate this metric suite over the session's records once it ends
    pub eval: Option<EvalSelector>,
    /// Override the configured replay-set fetch timeout
    pub fetch_timeout: Option<std::time::Duration>,
}

impl RunOptions {
    /// Create new run options
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session name
    pub fn with_session(mut self, name: impl Into<String>) -> Self {
        self.session = Some(name.into());
        self
    }

    /// Replay from a historical session
    pub fn with_replay_from(mut self, source: ReplaySource) -> Self {
        self.replay_from = Some(source);
        self
    }

    /// Evaluate a metric suite when the session ends
    pub fn with_eval(mut self, selector: EvalSelector) -> Self {
        self.eval = Some(selector);
        self
    }

    /// Override the replay-set fetch timeout
    pub fn with_fetch_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.fetch_timeout = Some(timeout);
        self
    }
}

/// Outcome of a completed session run
pub struct SessionRun<T> {
    /// The (ended) session
    pub session: Session,
    /// Whatever the scoped future returned
    pub output: T,
    /// Every record the session emitted, in emission order
    pub records: Vec<CallRecord>,
    /// Aggregate counts over the records
    pub summary: CollectorSummary,
    /// Metric results, empty when no suite was requested
    pub evaluations: Vec<EvaluationResult>,
}

impl<T> SessionRun<T> {
    /// The session's name, for feeding into replay or later evaluation
    pub fn session_name(&self) -> &str {
        self.session.name()
    }

    /// True when every evaluated metric succeeded; an empty suite passes
    pub fn passed(&self) -> bool {
        self.evaluations.iter().all(|e| e.success)
    }

    /// Look up one metric's result by name
    pub fn evaluation(&self, metric: &str) -> Option<&EvaluationResult> {
        self.evaluations.iter().find(|e| e.metric == metric)
    }
}
