//! Declarative metric configuration and evaluation results

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One declarative metric: which strategy runs, which values feed it and
/// any strategy parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricConfig {
    pub name: String,
    /// Registered strategy name, e.g. `string_match`, `QAG`, `DAG`
    pub methodology: String,
    /// Named inputs resolved from the tag-context: input name to path
    /// expression (`Svc.compute.return`, or a `$`-prefixed JSON path)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    /// Strategy parameters, passed through untouched
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl MetricConfig {
    pub fn new(name: impl Into<String>, methodology: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methodology: methodology.into(),
            ..Default::default()
        }
    }

    /// Map an input name to a tag-context path
    pub fn with_query(mut self, input: impl Into<String>, path: impl Into<String>) -> Self {
        self.query.insert(input.into(), path.into());
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, value: Value) -> Self {
        self.params.insert(name.into(), value);
        self
    }

    /// A parameter read as a bool, when present and boolean
    pub fn param_bool(&self, name: &str) -> Option<bool> {
        self.params.get(name).and_then(Value::as_bool)
    }

    /// A parameter read as a float, accepting integer JSON numbers
    pub fn param_f64(&self, name: &str) -> Option<f64> {
        self.params.get(name).and_then(Value::as_f64)
    }
}

/// An ordered metric suite, stored and versioned as one document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvalConfig {
    pub metrics: Vec<MetricConfig>,
}

impl EvalConfig {
    pub fn new(metrics: Vec<MetricConfig>) -> Self {
        Self { metrics }
    }
}

/// Outcome of evaluating one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    /// Name of the metric this result belongs to
    pub metric: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EvaluationResult {
    pub fn scored(metric: impl Into<String>, success: bool, score: f64) -> Self {
        Self {
            metric: metric.into(),
            success,
            score: Some(score),
            details: None,
            error: None,
        }
    }

    /// A non-fatal failure carrying a description instead of a score
    pub fn failed(metric: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            success: false,
            score: None,
            details: None,
            error: Some(error.into()),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}
