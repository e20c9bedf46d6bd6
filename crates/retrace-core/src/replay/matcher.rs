//! Deterministic matching of live calls against historical records
//!
//! Records are indexed per tag id in their original emission order, with a
//! secondary index under the alias (the segment after the last dot) for
//! records whose tag ids carry a dotted prefix. Each matched call claims the
//! next unconsumed index as a [`ReplayTicket`]; the cursor it observes stays
//! fixed for the lifetime of that call, so overlapping calls on the same tag
//! never race between selecting a record and committing it. Once a queue is
//! exhausted, further claims pin to the last record.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, warn};

use crate::intercept::ParamSpec;
use crate::record::{CallRecord, alias_of};

/// Shared per-session replay state. Cloning hands out another handle to the
/// same underlying queues.
#[derive(Clone, Default)]
pub struct ReplayMatcher {
    inner: Arc<MatcherState>,
}

#[derive(Default)]
struct MatcherState {
    exact: DashMap<String, TagQueue>,
    alias: DashMap<String, TagQueue>,
}

struct TagQueue {
    records: Vec<Arc<CallRecord>>,
    /// Indices handed out to in-flight calls, consumed or not
    claimed: usize,
    /// Claims committed by record emission
    consumed: usize,
}

impl TagQueue {
    fn new() -> Self {
        Self {
            records: Vec::new(),
            claimed: 0,
            consumed: 0,
        }
    }

    /// Claim the next index, pinned to the last record once exhausted
    fn claim(&mut self) -> (usize, Arc<CallRecord>) {
        debug_assert!(!self.records.is_empty());
        let index = self.claimed.min(self.records.len() - 1);
        self.claimed += 1;
        (index, Arc::clone(&self.records[index]))
    }

    fn release(&mut self) {
        self.claimed = self.claimed.saturating_sub(1);
    }

    fn commit(&mut self) {
        self.consumed += 1;
    }
}

impl ReplayMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the installed replay set. Records are indexed in input order
    /// under their exact tag id, and additionally under their alias when the
    /// tag id carries a dotted prefix. Cursors reset to the start.
    pub fn install(&self, records: Vec<CallRecord>) {
        self.inner.exact.clear();
        self.inner.alias.clear();
        let total = records.len();
        for record in records {
            let record = Arc::new(record);
            if let Some(alias) = alias_of(&record.tag_id) {
                self.inner
                    .alias
                    .entry(alias.to_string())
                    .or_insert_with(TagQueue::new)
                    .records
                    .push(Arc::clone(&record));
            }
            self.inner
                .exact
                .entry(record.tag_id.clone())
                .or_insert_with(TagQueue::new)
                .records
                .push(record);
        }
        debug!(
            records = total,
            tags = self.inner.exact.len(),
            "installed replay set"
        );
    }

    /// Remove all installed records and cursors
    pub fn clear(&self) {
        self.inner.exact.clear();
        self.inner.alias.clear();
    }

    /// Whether any records are installed
    pub fn is_empty(&self) -> bool {
        self.inner.exact.is_empty()
    }

    /// Claim the historical record a call under `label` should observe.
    /// Exact tag ids win over alias matches. Returns `None` when nothing is
    /// installed under either key. The claimed index is not committed; drop
    /// the ticket unconsumed to release it.
    pub fn peek(&self, label: &str) -> Option<ReplayTicket> {
        if let Some(mut queue) = self.inner.exact.get_mut(label) {
            if !queue.records.is_empty() {
                let (index, record) = queue.claim();
                return Some(ReplayTicket {
                    matcher: self.clone(),
                    key: label.to_string(),
                    via_alias: false,
                    index,
                    record,
                    open: true,
                });
            }
        }
        if let Some(mut queue) = self.inner.alias.get_mut(label) {
            if !queue.records.is_empty() {
                let (index, record) = queue.claim();
                warn!(
                    label,
                    matched_tag = %record.tag_id,
                    "replay matched by alias only; dotted prefixes differ"
                );
                return Some(ReplayTicket {
                    matcher: self.clone(),
                    key: label.to_string(),
                    via_alias: true,
                    index,
                    record,
                    open: true,
                });
            }
        }
        None
    }

    /// Number of committed consumptions for `label` (exact match, falling
    /// back to the alias queue). Claims held by in-flight calls are not
    /// counted until their records emit.
    pub fn cursor(&self, label: &str) -> usize {
        if let Some(queue) = self.inner.exact.get(label) {
            return queue.consumed;
        }
        self.inner
            .alias
            .get(label)
            .map(|queue| queue.consumed)
            .unwrap_or(0)
    }

    /// Number of records installed under `label` (exact matches only)
    pub fn records_for(&self, label: &str) -> usize {
        self.inner
            .exact
            .get(label)
            .map(|queue| queue.records.len())
            .unwrap_or(0)
    }

    fn with_queue(&self, key: &str, via_alias: bool, f: impl FnOnce(&mut TagQueue)) {
        let map = if via_alias {
            &self.inner.alias
        } else {
            &self.inner.exact
        };
        if let Some(mut queue) = map.get_mut(key) {
            f(&mut queue);
        }
    }
}

/// A claim on one historical record, held for the duration of a live call.
/// Consuming commits the cursor; dropping without consuming releases the
/// claim so the record is offered to the next call.
pub struct ReplayTicket {
    matcher: ReplayMatcher,
    key: String,
    via_alias: bool,
    index: usize,
    record: Arc<CallRecord>,
    open: bool,
}

impl ReplayTicket {
    /// The historical record this call observes
    pub fn record(&self) -> &CallRecord {
        &self.record
    }

    /// Queue position of the claimed record
    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether the match went through the alias index instead of the exact
    /// tag id
    pub fn via_alias(&self) -> bool {
        self.via_alias
    }

    /// Commit the claim and hand back the record for merging
    pub fn consume(mut self) -> Arc<CallRecord> {
        self.open = false;
        self.matcher
            .with_queue(&self.key, self.via_alias, TagQueue::commit);
        Arc::clone(&self.record)
    }
}

impl Drop for ReplayTicket {
    fn drop(&mut self) {
        if self.open {
            self.matcher
                .with_queue(&self.key, self.via_alias, TagQueue::release);
        }
    }
}

/// Resolve argument overrides from a historical record against the declared
/// parameter list. Only positions in a replaying mode receive a value;
/// lookup tries the declared name first, then the positional `arg{index}`
/// key. The result is aligned to live argument positions.
pub fn argument_overrides(historical: &CallRecord, params: &[ParamSpec]) -> Vec<Option<Value>> {
    let Some(args) = historical.payload.args.as_ref() else {
        return vec![None; params.len()];
    };
    params
        .iter()
        .enumerate()
        .map(|(index, param)| {
            if !param.mode.replays() {
                return None;
            }
            let by_name = param.name.as_ref().and_then(|name| args.get(name));
            by_name
                .or_else(|| args.get(&format!("arg{}", index)))
                .cloned()
        })
        .collect()
}
