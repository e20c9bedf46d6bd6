//! Storage boundary: record persistence, versioned eval configs, sinks
//!
//! Stores speak whole values over async traits and know nothing about
//! interception or evaluation internals. Everything is swappable behind
//! [`RecordStore`], [`ConfigStore`] and [`RecordSink`].

mod file;
mod memory;

pub use file::JsonlStore;
pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{RetraceError, RetraceResult};
use crate::eval::EvalConfig;
use crate::record::CallRecord;

/// Which stored config version to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    /// Highest version stored for the project
    Latest,
    /// A specific version number (versions start at 1)
    Exact(u32),
}

/// An eval config together with its assigned version number
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedConfig {
    pub version: u32,
    pub config: EvalConfig,
}

/// Persistence for emitted call records, grouped by project and session
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Append records to a session, preserving input order
    async fn append(
        &self,
        project: &str,
        session: &str,
        records: &[CallRecord],
    ) -> RetraceResult<()>;

    /// All records of a session in emission order, optionally narrowed to
    /// one tag id
    async fn query(
        &self,
        project: &str,
        session: &str,
        tag_id: Option<&str>,
    ) -> RetraceResult<Vec<CallRecord>>;
}

/// Versioned storage for declarative eval configs
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch a config version; `Ok(None)` when the project has no matching
    /// version
    async fn get_config(
        &self,
        project: &str,
        selector: VersionSelector,
    ) -> RetraceResult<Option<VersionedConfig>>;

    /// Store a new config version and return its assigned number. Versions
    /// are monotonically increasing per project, starting at 1.
    async fn put_config(&self, project: &str, config: &EvalConfig) -> RetraceResult<u32>;
}

/// Destination for records as they emit from live sessions
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn emit(&self, record: &CallRecord) -> RetraceResult<()>;
}

/// Record and config facets opened over one shared backing instance
#[derive(Clone)]
pub struct StoreHandles {
    pub records: Arc<dyn RecordStore>,
    pub configs: Arc<dyn ConfigStore>,
}

impl StoreHandles {
    /// Open the backend a [`StorageConfig`](crate::config::StorageConfig)
    /// names: a process-local memory store or JSONL files under the
    /// resolved root
    pub fn open(storage: &crate::config::StorageConfig) -> Self {
        match storage.backend {
            crate::config::StorageBackend::Memory => {
                let store = Arc::new(MemoryStore::new());
                Self {
                    records: store.clone(),
                    configs: store,
                }
            }
            crate::config::StorageBackend::File => {
                let store = Arc::new(JsonlStore::new(storage.resolve_root()));
                Self {
                    records: store.clone(),
                    configs: store,
                }
            }
        }
    }
}

/// Forwards emitted records into a [`RecordStore`] under the project and
/// session stamped on each record
pub struct StoreSink {
    store: Arc<dyn RecordStore>,
}

impl StoreSink {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl RecordSink for StoreSink {
    async fn emit(&self, record: &CallRecord) -> RetraceResult<()> {
        let (Some(project), Some(session)) = (record.project.as_deref(), record.session.as_deref())
        else {
            return Err(RetraceError::invalid_input(
                "record carries no session context; nothing to store it under",
            ));
        };
        self.store
            .append(project, session, std::slice::from_ref(record))
            .await
    }
}
