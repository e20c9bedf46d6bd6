//! Session startup and replay bootstrap

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{RetraceError, RetraceResult};
use crate::session::Session;
use crate::store::{RecordSink, RecordStore, StoreSink};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a new session's replay set comes from
#[derive(Debug, Clone)]
pub struct ReplaySource {
    /// Historical session to load records from
    pub session: String,
    /// Restrict the set to a single tag id
    pub tag_id: Option<String>,
}

impl ReplaySource {
    pub fn session(name: impl Into<String>) -> Self {
        Self {
            session: name.into(),
            tag_id: None,
        }
    }

    pub fn with_tag(mut self, tag_id: impl Into<String>) -> Self {
        self.tag_id = Some(tag_id.into());
        self
    }
}

/// Options for starting a session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub project: String,
    /// Session name; generated when absent
    pub session: Option<String>,
    /// Load this source's records as the replay set at startup
    pub replay_from: Option<ReplaySource>,
    /// Upper bound on the bootstrap fetch before falling back to an empty
    /// replay set
    pub fetch_timeout: Duration,
}

impl SessionOptions {
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            session: None,
            replay_from: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_session(mut self, name: impl Into<String>) -> Self {
        self.session = Some(name.into());
        self
    }

    pub fn with_replay_from(mut self, source: ReplaySource) -> Self {
        self.replay_from = Some(source);
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }
}

/// Wires new sessions to storage: a record store for replay bootstrap and a
/// sink for live emission. With a store but no explicit sink, emitted
/// records flow back into the store.
#[derive(Default)]
pub struct SessionManager {
    store: Option<Arc<dyn RecordStore>>,
    sink: Option<Arc<dyn RecordSink>>,
}

impl SessionManager {
    /// A manager with no backends; sessions collect in memory only
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Start a session. A requested replay set is fetched within the
    /// configured timeout; fetch failures and timeouts log a warning and
    /// leave the replay set empty rather than failing the run.
    #[instrument(skip(self), fields(project = %options.project))]
    pub async fn start_session(&self, options: SessionOptions) -> RetraceResult<Session> {
        let name = options
            .session
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let sink = self
            .sink
            .clone()
            .or_else(|| self.store.clone().map(|s| Arc::new(StoreSink::new(s)) as _));
        let session = match sink {
            Some(sink) => Session::with_sink(&options.project, &name, sink),
            None => Session::new(&options.project, &name),
        };

        if let Some(source) = options.replay_from {
            let store = self.store.clone().ok_or_else(|| {
                RetraceError::config("replay bootstrap requires a record store")
            })?;
            let records = self
                .fetch_replay_set(&store, &options.project, &source, options.fetch_timeout)
                .await;
            info!(
                session = %name,
                source = %source.session,
                records = records.len(),
                "replay set installed"
            );
            session.install_replay_set(records)?;
        }

        info!(session = %name, "session started");
        Ok(session)
    }

    async fn fetch_replay_set(
        &self,
        store: &Arc<dyn RecordStore>,
        project: &str,
        source: &ReplaySource,
        timeout: Duration,
    ) -> Vec<crate::record::CallRecord> {
        let query = store.query(project, &source.session, source.tag_id.as_deref());
        match tokio::time::timeout(timeout, query).await {
            Ok(Ok(records)) => records,
            Ok(Err(e)) => {
                warn!(
                    source = %source.session,
                    error = %e,
                    "replay bootstrap failed; starting with empty replay set"
                );
                Vec::new()
            }
            Err(_) => {
                warn!(
                    source = %source.session,
                    timeout_ms = timeout.as_millis() as u64,
                    "replay bootstrap timed out; starting with empty replay set"
                );
                Vec::new()
            }
        }
    }
}
