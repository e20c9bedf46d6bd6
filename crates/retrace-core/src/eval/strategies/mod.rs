//! Evaluation strategies
//!
//! A strategy is a pure function over a metric and its resolved inputs.
//! Missing inputs arrive as `null` and score accordingly; strategies never
//! fail the evaluation pass.

mod dag;
mod qag;
mod string_match;

pub use dag::DagStrategy;
pub use qag::QagStrategy;
pub use string_match::StringMatchStrategy;

use std::collections::BTreeMap;

use serde_json::Value;

use crate::eval::types::{EvaluationResult, MetricConfig};

pub trait EvalStrategy: Send + Sync {
    /// Name this strategy registers under
    fn name(&self) -> &'static str;

    fn evaluate(&self, metric: &MetricConfig, inputs: &BTreeMap<String, Value>)
    -> EvaluationResult;
}

/// The value under test: the input named `target`, else the sole input
/// when exactly one was resolved, else `null`
pub(crate) fn target_input(inputs: &BTreeMap<String, Value>) -> Value {
    if let Some(value) = inputs.get("target") {
        return value.clone();
    }
    if inputs.len() == 1 {
        return inputs.values().next().cloned().unwrap_or(Value::Null);
    }
    Value::Null
}

/// Reference material for a strategy: a named input first, the
/// same-named param second
pub(crate) fn reference_value(
    metric: &MetricConfig,
    inputs: &BTreeMap<String, Value>,
    name: &str,
) -> Value {
    if let Some(value) = inputs.get(name) {
        if !value.is_null() {
            return value.clone();
        }
    }
    metric.params.get(name).cloned().unwrap_or(Value::Null)
}

/// Flatten a value to comparison text: strings verbatim, `null` empty,
/// anything else in compact JSON form
pub(crate) fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A value as a list of comparison strings: an array element-wise, a
/// single value as a one-element list, `null` as empty
pub(crate) fn texts_of(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().map(text_of).collect(),
        other => vec![text_of(other)],
    }
}
