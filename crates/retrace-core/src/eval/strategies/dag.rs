//! Ordered-step coverage

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::eval::strategies::{EvalStrategy, reference_value, target_input, text_of, texts_of};
use crate::eval::types::{EvaluationResult, MetricConfig};

/// Checks that the expected steps occur in order. The target may be a list
/// (steps matched element-wise as an in-order subsequence) or a single
/// text (steps matched as substrings at strictly increasing positions).
/// Matching is case-insensitive. The score is the longest in-order prefix
/// coverage over all expected steps; passes at the `threshold` param,
/// default 1.0. No expected steps passes vacuously.
pub struct DagStrategy;

const DEFAULT_THRESHOLD: f64 = 1.0;

impl EvalStrategy for DagStrategy {
    fn name(&self) -> &'static str {
        "DAG"
    }

    fn evaluate(
        &self,
        metric: &MetricConfig,
        inputs: &BTreeMap<String, Value>,
    ) -> EvaluationResult {
        let steps: Vec<String> = texts_of(&reference_value(metric, inputs, "steps"))
            .into_iter()
            .map(|s| s.to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        if steps.is_empty() {
            return EvaluationResult::scored(&metric.name, true, 1.0)
                .with_details(json!({"steps": 0, "note": "no steps to cover"}));
        }

        let target = target_input(inputs);
        let matched = match &target {
            Value::Array(items) => subsequence_matches(&steps, items),
            other => substring_matches(&steps, &text_of(other)),
        };

        let score = matched as f64 / steps.len() as f64;
        let threshold = metric.param_f64("threshold").unwrap_or(DEFAULT_THRESHOLD);
        let mut details = json!({
            "steps": steps.len(),
            "matched": matched,
            "threshold": threshold,
        });
        if matched < steps.len() {
            details["nextExpected"] = json!(steps[matched]);
        }
        EvaluationResult::scored(&metric.name, score >= threshold, score).with_details(details)
    }
}

/// How many leading steps appear element-wise, in order, within `items`
fn subsequence_matches(steps: &[String], items: &[Value]) -> usize {
    let mut next = 0;
    for item in items {
        if next == steps.len() {
            break;
        }
        if text_of(item).to_lowercase().contains(&steps[next]) {
            next += 1;
        }
    }
    next
}

/// How many leading steps occur as substrings at strictly increasing
/// positions within `text`
fn substring_matches(steps: &[String], text: &str) -> usize {
    let lowered = text.to_lowercase();
    let mut offset = 0;
    let mut matched = 0;
    for step in steps {
        match lowered[offset..].find(step.as_str()) {
            Some(position) => {
                offset += position + step.len();
                matched += 1;
            }
            None => break,
        }
    }
    matched
}
