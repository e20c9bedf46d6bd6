//! Call record schema
//!
//! A [`CallRecord`] is the normalized envelope for one instrumented
//! invocation: which operation ran, when, under which project/session, with
//! which inputs, and what came out. Records are plain data with a camelCase
//! JSON wire format and are treated as immutable once emitted; everything
//! downstream (storage, replay sets, evaluation) works on owned clones.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Current time as epoch milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Normalized capture of one instrumented invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRecord {
    /// Logical identifier of the instrumented operation (e.g. `Svc.compute`).
    /// Not guaranteed globally unique across overloaded registrations.
    pub tag_id: String,
    /// Call start time, epoch milliseconds. Always reflects the real call
    /// start, never a replayed value.
    pub timestamp: i64,
    /// Session correlation identifier, from the active context at emission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<String>,
    /// Project correlation identifier, from the active context at emission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Captured inputs and outcome
    #[serde(default)]
    pub payload: CallPayload,
}

/// Captured data for one call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallPayload {
    /// Argument values keyed by declared parameter name, or by the
    /// positional fallback key `arg{index}` when no name was declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<BTreeMap<String, Value>>,
    /// Inline-captured intermediate values, keyed by caller-supplied name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vars: Option<BTreeMap<String, VarCapture>>,
    /// Captured return value
    #[serde(rename = "return", skip_serializing_if = "Option::is_none")]
    pub return_value: Option<Value>,
    /// Failure description when the call raised
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Completion time, epoch milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<i64>,
    /// Elapsed wall time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// True iff at least one of args/vars/return was substituted from a
    /// historical record rather than taken from the live call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replayed: Option<bool>,
}

/// One inline-captured value, tagged with its capture site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarCapture {
    /// The captured value
    pub value: Value,
    /// Capture-site descriptor, `file:line`
    pub at: String,
}

impl CallRecord {
    /// Create a record for the given tag, timestamped now
    pub fn new(tag_id: impl Into<String>) -> Self {
        Self {
            tag_id: tag_id.into(),
            timestamp: now_millis(),
            session: None,
            project: None,
            payload: CallPayload::default(),
        }
    }

    /// Set one captured argument (builder style, used mostly when
    /// assembling replay sets by hand)
    pub fn with_arg(mut self, name: impl Into<String>, value: Value) -> Self {
        self.payload
            .args
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value);
        self
    }

    /// Set one captured var (builder style)
    pub fn with_var(mut self, name: impl Into<String>, value: Value, at: impl Into<String>) -> Self {
        self.payload.vars.get_or_insert_with(BTreeMap::new).insert(
            name.into(),
            VarCapture {
                value,
                at: at.into(),
            },
        );
        self
    }

    /// Set the captured return value (builder style)
    pub fn with_return(mut self, value: Value) -> Self {
        self.payload.return_value = Some(value);
        self
    }

    /// Set the session/project correlation identifiers (builder style)
    pub fn with_context(
        mut self,
        project: impl Into<String>,
        session: impl Into<String>,
    ) -> Self {
        self.project = Some(project.into());
        self.session = Some(session.into());
        self
    }

    /// Whether any field of this record was substituted during replay
    pub fn is_replayed(&self) -> bool {
        self.payload.replayed.unwrap_or(false)
    }

    /// The last dot-delimited segment of the tag, used as the replay alias
    /// key (`Svc.compute` → `compute`); `None` when the tag has no dot
    pub fn alias(&self) -> Option<&str> {
        alias_of(&self.tag_id)
    }
}

/// Alias key for a tag: its last dot-delimited segment, when distinct
pub fn alias_of(tag_id: &str) -> Option<&str> {
    match tag_id.rsplit_once('.') {
        Some((_, last)) if !last.is_empty() => Some(last),
        _ => None,
    }
}

/// Serialize a value for capture, degrading to a sentinel string when the
/// value cannot be represented. Capture must never abort the call it
/// observes, so the failure is logged and swallowed here.
pub fn serialize_or_sentinel<T: Serialize>(value: &T, what: &str) -> Value {
    match serde_json::to_value(value) {
        Ok(v) => v,
        Err(e) => {
            warn!(what, error = %e, "value could not be serialized for capture");
            Value::String(format!("<unserializable: {}>", e))
        }
    }
}
