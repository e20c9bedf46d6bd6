//! Substring containment

use std::collections::BTreeMap;

use serde_json::{Value, json};

use crate::eval::strategies::{EvalStrategy, reference_value, target_input, text_of, texts_of};
use crate::eval::types::{EvaluationResult, MetricConfig};

/// Passes when every expected string occurs inside the target text.
/// Comparison is case-insensitive unless the `caseSensitive` param is set.
/// No expected strings at all counts as contained, so the metric passes
/// vacuously.
pub struct StringMatchStrategy;

impl EvalStrategy for StringMatchStrategy {
    fn name(&self) -> &'static str {
        "string_match"
    }

    fn evaluate(
        &self,
        metric: &MetricConfig,
        inputs: &BTreeMap<String, Value>,
    ) -> EvaluationResult {
        let case_sensitive = metric.param_bool("caseSensitive").unwrap_or(false);
        let mut actual = text_of(&target_input(inputs));
        let mut expected = texts_of(&reference_value(metric, inputs, "expected"));
        expected.retain(|s| !s.is_empty());
        if !case_sensitive {
            actual = actual.to_lowercase();
            for s in &mut expected {
                *s = s.to_lowercase();
            }
        }

        if expected.is_empty() {
            return EvaluationResult::scored(&metric.name, true, 1.0)
                .with_details(json!({"expected": 0, "note": "no expected strings"}));
        }

        let missing: Vec<&String> = expected.iter().filter(|s| !actual.contains(*s)).collect();
        let score = (expected.len() - missing.len()) as f64 / expected.len() as f64;
        EvaluationResult::scored(&metric.name, missing.is_empty(), score)
            .with_details(json!({"expected": expected.len(), "missing": missing}))
    }
}
