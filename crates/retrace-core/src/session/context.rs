//! Task-scoped session context
//!
//! A [`Session`] is bound to a stretch of async work with [`Session::scope`]
//! and travels through every `.await` inside it via a task-local, never
//! through global state. Work spawned onto the runtime does not inherit the
//! binding; [`Session::spawn`] re-binds an explicit snapshot so each branch
//! carries the context it was given at spawn time, unaffected by what
//! sibling branches do to theirs.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tracing::{debug, info, warn};

use crate::error::{RetraceError, RetraceResult};
use crate::record::CallRecord;
use crate::replay::ReplayMatcher;
use crate::session::collector::{CollectorSummary, RecordCollector, spawn_sink_worker};
use crate::store::RecordSink;

tokio::task_local! {
    static ACTIVE_SESSION: Session;
}

/// How long `end` waits for the sink worker to drain before detaching it
const END_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to one live capture session. Clones share all state: the replay
/// queues, the collected records and the emission channel.
#[derive(Clone)]
pub struct Session {
    shared: Arc<SessionShared>,
}

struct SessionShared {
    project: String,
    name: String,
    replay: ReplayMatcher,
    collector: RecordCollector,
    sink_tx: Mutex<Option<mpsc::UnboundedSender<CallRecord>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    ended: CancellationToken,
}

impl Session {
    /// A session that collects records in memory only
    pub fn new(project: impl Into<String>, name: impl Into<String>) -> Self {
        Self::build(project.into(), name.into(), None)
    }

    /// A session that additionally streams records to `sink` from a
    /// background worker
    pub fn with_sink(
        project: impl Into<String>,
        name: impl Into<String>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self::build(project.into(), name.into(), Some(sink))
    }

    fn build(project: String, name: String, sink: Option<Arc<dyn RecordSink>>) -> Self {
        let (sink_tx, worker) = match sink {
            Some(sink) => {
                let (tx, handle) = spawn_sink_worker(sink);
                (Some(tx), Some(handle))
            }
            None => (None, None),
        };
        Self {
            shared: Arc::new(SessionShared {
                project,
                name,
                replay: ReplayMatcher::new(),
                collector: RecordCollector::new(),
                sink_tx: Mutex::new(sink_tx),
                worker: Mutex::new(worker),
                ended: CancellationToken::new(),
            }),
        }
    }

    pub fn project(&self) -> &str {
        &self.shared.project
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// The session's replay queues
    pub fn replay(&self) -> &ReplayMatcher {
        &self.shared.replay
    }

    /// Install a replay set, replacing any previous one. Rejected once the
    /// session has ended.
    pub fn install_replay_set(&self, records: Vec<CallRecord>) -> RetraceResult<()> {
        if self.is_ended() {
            return Err(RetraceError::invalid_input(
                "session has ended; replay sets can no longer change",
            ));
        }
        self.shared.replay.install(records);
        Ok(())
    }

    /// Drop the replay set; subsequent calls run live
    pub fn clear_replay_set(&self) {
        self.shared.replay.clear();
    }

    /// Records emitted so far, in emission order
    pub fn records(&self) -> Vec<CallRecord> {
        self.shared.collector.snapshot()
    }

    pub fn summary(&self) -> CollectorSummary {
        self.shared.collector.summary()
    }

    pub fn is_ended(&self) -> bool {
        self.shared.ended.is_cancelled()
    }

    /// Run `fut` with this session bound as the active context. Bindings
    /// nest; the innermost scope wins for the duration of `fut`.
    pub async fn scope<F>(&self, fut: F) -> F::Output
    where
        F: Future,
    {
        ACTIVE_SESSION.scope(self.clone(), fut).await
    }

    /// Spawn `fut` onto the runtime with this session re-bound inside the
    /// new task. The spawned branch keeps the snapshot it was given here
    /// even if the caller later rebinds its own scope.
    pub fn spawn<F>(&self, fut: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let session = self.clone();
        tokio::spawn(async move { session.scope(fut).await })
    }

    /// End the session: stop accepting replay changes, close the emission
    /// channel and wait for queued records to flush. Calls still in flight
    /// hold their own channel handles and finish emitting on their own; a
    /// worker that cannot drain within the flush timeout is detached with a
    /// warning rather than awaited forever. Idempotent.
    pub async fn end(&self) {
        if self.shared.ended.is_cancelled() {
            return;
        }
        self.shared.ended.cancel();
        drop(self.shared.sink_tx.lock().take());
        let worker = self.shared.worker.lock().take();
        if let Some(handle) = worker {
            match tokio::time::timeout(END_FLUSH_TIMEOUT, handle).await {
                Ok(Ok(())) => debug!(session = %self.shared.name, "session sink flushed"),
                Ok(Err(e)) => warn!(session = %self.shared.name, error = %e, "sink worker aborted"),
                Err(_) => warn!(
                    session = %self.shared.name,
                    "sink flush timed out; worker left draining in background"
                ),
            }
        }
        info!(
            project = %self.shared.project,
            session = %self.shared.name,
            records = self.shared.collector.len(),
            "session ended"
        );
    }

    /// Channel handle for one call's emission, taken at call start. `None`
    /// once the session has ended or when no sink is configured.
    pub(crate) fn bind_sink(&self) -> Option<mpsc::UnboundedSender<CallRecord>> {
        self.shared.sink_tx.lock().clone()
    }

    pub(crate) fn collector(&self) -> &RecordCollector {
        &self.shared.collector
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("project", &self.shared.project)
            .field("name", &self.shared.name)
            .field("records", &self.shared.collector.len())
            .field("ended", &self.is_ended())
            .finish_non_exhaustive()
    }
}

/// The session bound to the current task, if any
pub fn current() -> Option<Session> {
    ACTIVE_SESSION.try_with(Clone::clone).ok()
}
