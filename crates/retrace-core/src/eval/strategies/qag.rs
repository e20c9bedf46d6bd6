//! Heuristic keyword-coverage grading

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::eval::strategies::{EvalStrategy, reference_value, target_input, text_of, texts_of};
use crate::eval::types::{EvaluationResult, MetricConfig};

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-z0-9]+").expect("word pattern compiles"));

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "will", "with", "that", "this", "from", "have",
    "has", "had", "not", "but", "you", "your", "our", "their", "they", "its", "can", "all",
    "should", "would", "could", "there", "which", "what", "when", "where", "how",
];

/// Grades an answer by how many reference keywords it covers. Keywords are
/// the distinct lowercase alphanumeric words of at least three characters
/// in the reference, minus a stopword list; an explicit `keywords` param
/// bypasses extraction. Passes at the `threshold` param, default 0.5. A
/// reference with no usable keywords passes vacuously.
pub struct QagStrategy;

const DEFAULT_THRESHOLD: f64 = 0.5;

impl EvalStrategy for QagStrategy {
    fn name(&self) -> &'static str {
        "QAG"
    }

    fn evaluate(
        &self,
        metric: &MetricConfig,
        inputs: &BTreeMap<String, Value>,
    ) -> EvaluationResult {
        let answer = inputs
            .get("answer")
            .cloned()
            .unwrap_or_else(|| target_input(inputs));
        let answer_words = words_of(&text_of(&answer));

        let keywords: BTreeSet<String> = if let Some(explicit) = metric.params.get("keywords") {
            texts_of(explicit)
                .into_iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect()
        } else {
            let reference = reference_value(metric, inputs, "reference");
            keywords_of(&text_of(&reference))
        };

        if keywords.is_empty() {
            return EvaluationResult::scored(&metric.name, true, 1.0)
                .with_details(json!({"keywords": 0, "note": "no keywords to cover"}));
        }

        let missing: Vec<&String> = keywords
            .iter()
            .filter(|k| !answer_words.contains(*k))
            .collect();
        let covered = keywords.len() - missing.len();
        let score = covered as f64 / keywords.len() as f64;
        let threshold = metric.param_f64("threshold").unwrap_or(DEFAULT_THRESHOLD);
        EvaluationResult::scored(&metric.name, score >= threshold, score).with_details(json!({
            "keywords": keywords.len(),
            "covered": covered,
            "missing": missing,
            "threshold": threshold,
        }))
    }
}

fn words_of(text: &str) -> BTreeSet<String> {
    let lowered = text.to_lowercase();
    WORD.find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Distinct keywords of a reference text: words of three or more
/// characters that are not stopwords
fn keywords_of(text: &str) -> BTreeSet<String> {
    words_of(text)
        .into_iter()
        .filter(|w| w.len() >= 3 && !STOPWORDS.contains(&w.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(metric: &MetricConfig, answer: Value) -> EvaluationResult {
        let mut inputs = BTreeMap::new();
        inputs.insert("answer".to_string(), answer);
        QagStrategy.evaluate(metric, &inputs)
    }

    #[test]
    fn test_keyword_extraction_drops_stopwords_and_short_words() {
        let keywords = keywords_of("The cache is warmed from the snapshot, and it works");
        assert!(keywords.contains("cache"));
        assert!(keywords.contains("warmed"));
        assert!(keywords.contains("snapshot"));
        assert!(!keywords.contains("the"));
        assert!(!keywords.contains("is"));
        assert!(!keywords.contains("and"));
    }

    #[test]
    fn test_full_coverage_passes() {
        let metric = MetricConfig::new("grounded", "QAG")
            .with_param("reference", json!("cache warmed snapshot"));
        let result = run(
            &metric,
            json!("the cache was warmed from the latest snapshot"),
        );
        assert!(result.success);
        assert_eq!(result.score, Some(1.0));
    }

    #[test]
    fn test_partial_coverage_against_threshold() {
        let metric = MetricConfig::new("grounded", "QAG")
            .with_param("keywords", json!(["alpha", "beta", "gamma", "delta"]));

        let half = run(&metric, json!("alpha and beta only"));
        assert_eq!(half.score, Some(0.5));
        assert!(half.success);

        let strict = MetricConfig::new("grounded", "QAG")
            .with_param("keywords", json!(["alpha", "beta", "gamma", "delta"]))
            .with_param("threshold", json!(0.75));
        let mut inputs = BTreeMap::new();
        inputs.insert("answer".to_string(), json!("alpha and beta only"));
        let result = QagStrategy.evaluate(&strict, &inputs);
        assert!(!result.success);
    }

    #[test]
    fn test_empty_reference_passes_vacuously() {
        let metric = MetricConfig::new("grounded", "QAG");
        let result = run(&metric, json!("anything at all"));
        assert!(result.success);
        assert_eq!(result.score, Some(1.0));
    }

    #[test]
    fn test_missing_answer_scores_zero() {
        let metric =
            MetricConfig::new("grounded", "QAG").with_param("keywords", json!(["needle"]));
        let result = QagStrategy.evaluate(&metric, &BTreeMap::new());
        assert!(!result.success);
        assert_eq!(result.score, Some(0.0));
    }
}
