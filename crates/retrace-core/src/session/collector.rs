//! In-session record collection and background emission

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::record::CallRecord;
use crate::store::RecordSink;

/// Ordered, shared collection of the records a session has emitted so far
#[derive(Clone, Default)]
pub struct RecordCollector {
    records: Arc<Mutex<Vec<CallRecord>>>,
}

impl RecordCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, record: CallRecord) {
        self.records.lock().push(record);
    }

    /// Copy of everything collected, in emission order
    pub fn snapshot(&self) -> Vec<CallRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    pub fn summary(&self) -> CollectorSummary {
        let records = self.records.lock();
        let mut summary = CollectorSummary {
            total: records.len(),
            ..Default::default()
        };
        for record in records.iter() {
            if record.payload.error.is_some() {
                summary.errors += 1;
            }
            if record.is_replayed() {
                summary.replayed += 1;
            }
            *summary.by_tag.entry(record.tag_id.clone()).or_insert(0) += 1;
        }
        summary
    }
}

/// Aggregate view over a session's records
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectorSummary {
    pub total: usize,
    pub errors: usize,
    pub replayed: usize,
    pub by_tag: BTreeMap<String, usize>,
}

/// Spawn the task that forwards emitted records to an external sink. The
/// worker drains until every sender clone is dropped, so calls still in
/// flight when a session ends finish emitting before it exits. Delivery
/// failures are logged and never surface to instrumented code.
pub(crate) fn spawn_sink_worker(
    sink: Arc<dyn RecordSink>,
) -> (mpsc::UnboundedSender<CallRecord>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<CallRecord>();
    let handle = tokio::spawn(async move {
        let mut delivered = 0usize;
        let mut failed = 0usize;
        while let Some(record) = rx.recv().await {
            match sink.emit(&record).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    failed += 1;
                    warn!(tag = %record.tag_id, error = %e, "record delivery failed; continuing");
                }
            }
        }
        debug!(delivered, failed, "record sink drained");
    });
    (tx, handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetraceResult;
    use async_trait::async_trait;

    #[test]
    fn test_summary_counts() {
        let collector = RecordCollector::new();
        collector.append(CallRecord::new("a.one"));
        let mut failed = CallRecord::new("a.one");
        failed.payload.error = Some("boom".to_string());
        collector.append(failed);
        let mut replayed = CallRecord::new("b.two");
        replayed.payload.replayed = Some(true);
        collector.append(replayed);

        let summary = collector.summary();
        assert_eq!(summary.total, 3);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.replayed, 1);
        assert_eq!(summary.by_tag.get("a.one"), Some(&2));
    }

    struct FlakySink {
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl RecordSink for FlakySink {
        async fn emit(&self, record: &CallRecord) -> RetraceResult<()> {
            if record.tag_id == "always.fails" {
                return Err(crate::error::RetraceError::emission("sink offline"));
            }
            self.seen.lock().push(record.tag_id.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_worker_drains_in_order_and_survives_failures() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::new(FlakySink { seen: seen.clone() });
        let (tx, handle) = spawn_sink_worker(sink);

        tx.send(CallRecord::new("a.one")).unwrap();
        tx.send(CallRecord::new("always.fails")).unwrap();
        tx.send(CallRecord::new("b.two")).unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(*seen.lock(), vec!["a.one".to_string(), "b.two".to_string()]);
    }
}
