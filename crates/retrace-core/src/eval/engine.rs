//! The evaluation engine: metrics against record sets

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::error::RetraceError;
use crate::eval::context::TagContext;
use crate::eval::registry::StrategyRegistry;
use crate::eval::strategies::EvalStrategy;
use crate::eval::types::{EvaluationResult, MetricConfig};
use crate::record::CallRecord;

/// Evaluates declarative metrics over captured records. Metrics are
/// independent of each other; a metric that cannot run degrades to a
/// failed result and never aborts the pass.
pub struct Evaluator {
    registry: StrategyRegistry,
}

impl Evaluator {
    /// An evaluator with the built-in strategies registered
    pub fn new() -> Self {
        Self {
            registry: StrategyRegistry::with_builtins(),
        }
    }

    /// Add a custom strategy, replacing a built-in of the same name
    pub fn with_strategy(mut self, strategy: Arc<dyn EvalStrategy>) -> Self {
        self.registry.register(strategy);
        self
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Evaluate one metric against a record set
    pub fn evaluate(&self, metric: &MetricConfig, records: &[CallRecord]) -> EvaluationResult {
        self.evaluate_in(metric, &TagContext::from_records(records))
    }

    /// Evaluate one metric against a prebuilt tag-context
    pub fn evaluate_in(&self, metric: &MetricConfig, context: &TagContext) -> EvaluationResult {
        let Some(strategy) = self.registry.get(&metric.methodology) else {
            warn!(
                metric = %metric.name,
                methodology = %metric.methodology,
                "no such strategy; metric degraded to failure"
            );
            return EvaluationResult::failed(
                &metric.name,
                RetraceError::unknown_methodology(&metric.methodology).to_string(),
            );
        };
        let inputs = context.resolve_inputs(&metric.query);
        let result = strategy.evaluate(metric, &inputs);
        debug!(
            metric = %metric.name,
            success = result.success,
            score = result.score,
            "metric evaluated"
        );
        result
    }

    /// Evaluate every metric independently, results in input order. An
    /// empty suite yields an empty result list.
    #[instrument(skip_all, fields(metrics = metrics.len(), records = records.len()))]
    pub fn evaluate_all(
        &self,
        metrics: &[MetricConfig],
        records: &[CallRecord],
    ) -> Vec<EvaluationResult> {
        let context = TagContext::from_records(records);
        metrics
            .iter()
            .map(|metric| self.evaluate_in(metric, &context))
            .collect()
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary_records() -> Vec<CallRecord> {
        vec![
            CallRecord::new("Svc.compute")
                .with_arg("x", json!(1))
                .with_return(json!("Summary OK")),
        ]
    }

    fn has_summary_metric() -> MetricConfig {
        MetricConfig::new("hasSummary", "string_match")
            .with_query("target", "Svc.compute.return")
            .with_param("caseSensitive", json!(false))
    }

    #[test]
    fn test_vacuous_success_without_expected() {
        let evaluator = Evaluator::new();
        let result = evaluator.evaluate(&has_summary_metric(), &summary_records());
        assert!(result.success);
    }

    #[test]
    fn test_expected_substring_checked_against_resolved_input() {
        let evaluator = Evaluator::new();
        let metric = has_summary_metric().with_param("expected", json!("summary"));
        assert!(evaluator.evaluate(&metric, &summary_records()).success);

        let metric = has_summary_metric().with_param("expected", json!("absent"));
        assert!(!evaluator.evaluate(&metric, &summary_records()).success);
    }

    #[test]
    fn test_unknown_methodology_degrades() {
        let evaluator = Evaluator::new();
        let metric = MetricConfig::new("fancy", "LLM_JUDGE");
        let result = evaluator.evaluate(&metric, &summary_records());
        assert!(!result.success);
        assert!(result.error.unwrap().contains("LLM_JUDGE"));
    }

    #[test]
    fn test_evaluate_all_preserves_order_and_handles_empty() {
        let evaluator = Evaluator::new();
        assert!(evaluator.evaluate_all(&[], &summary_records()).is_empty());

        let metrics = vec![
            MetricConfig::new("b", "string_match").with_query("target", "Svc.compute.return"),
            MetricConfig::new("a", "nope"),
        ];
        let results = evaluator.evaluate_all(&metrics, &summary_records());
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].metric, "b");
        assert_eq!(results[1].metric, "a");
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let evaluator = Evaluator::new();
        let metrics = vec![
            has_summary_metric().with_param("expected", json!("summary")),
            MetricConfig::new("grounded", "QAG")
                .with_query("answer", "Svc.compute.return")
                .with_param("keywords", json!(["summary"])),
        ];
        let records = summary_records();
        let first = evaluator.evaluate_all(&metrics, &records);
        let second = evaluator.evaluate_all(&metrics, &records);
        assert_eq!(first, second);
    }
}
