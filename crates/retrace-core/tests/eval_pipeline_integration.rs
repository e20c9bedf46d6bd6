//! Integration tests for the evaluation pipeline
//!
//! Tests the path from instrumented calls through the tag-context into
//! metric results, including stored suites and custom strategies.

use std::collections::BTreeMap;
use std::sync::Arc;

use retrace_core::error::{RetraceError, RetraceResult};
use retrace_core::eval::{
    EvalConfig, EvalStrategy, EvaluationResult, Evaluator, MetricConfig, TagContext,
};
use retrace_core::intercept::{CallSpec, CaptureMode, Instrumentor, capture_var};
use retrace_core::session::Session;
use retrace_core::store::{ConfigStore, MemoryStore, VersionSelector};
use serde_json::{Value, json};

struct Support;

fn support_instrumentor() -> Instrumentor {
    Instrumentor::of::<Support>()
        .method("classify", |spec| {
            spec.param("ticket", CaptureMode::Trace)
                .returns(CaptureMode::TraceAndReplay)
        })
        .method("respond", |spec| {
            spec.param("category", CaptureMode::Trace)
                .returns(CaptureMode::Trace)
        })
        .build()
}

/// One support turn: classify a ticket, then draft a reply
async fn run_support_turn(session: &Session) -> RetraceResult<()> {
    let instrumentor = support_instrumentor();
    let classify = instrumentor
        .spec("classify")
        .ok_or_else(|| RetraceError::not_found("classify is not registered"))?;
    let respond = instrumentor
        .spec("respond")
        .ok_or_else(|| RetraceError::not_found("respond is not registered"))?;

    session
        .scope(async {
            let category = classify
                .invoke(
                    ("My parcel never arrived".to_string(),),
                    |(ticket,)| async move {
                        capture_var("model", &"cls-small");
                        let category = if ticket.contains("parcel") {
                            "shipping"
                        } else {
                            "other"
                        };
                        Ok::<_, RetraceError>(category.to_string())
                    },
                )
                .await?;
            respond
                .invoke((category,), |(category,)| async move {
                    Ok::<_, RetraceError>(format!(
                        "We are sorry about the {category} delay; a refund is on its way."
                    ))
                })
                .await?;
            Ok::<_, RetraceError>(())
        })
        .await
}

/// Records produced by instrumented calls feed metrics directly
#[tokio::test]
async fn test_live_records_feed_the_suite() -> RetraceResult<()> {
    let session = Session::new("helpdesk", "turn-1");
    run_support_turn(&session).await?;

    let suite = EvalConfig::new(vec![
        MetricConfig::new("categorized", "string_match")
            .with_query("target", "Support.classify.return")
            .with_param("expected", json!("shipping")),
        MetricConfig::new("apologetic", "QAG")
            .with_query("answer", "Support.respond.return")
            .with_param("keywords", json!(["sorry", "refund", "delay"])),
    ]);

    let evaluator = Evaluator::new();
    let results = evaluator.evaluate_all(&suite.metrics, &session.records());
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].metric, "categorized");
    assert!(results.iter().all(|r| r.success));
    assert_eq!(results[1].score, Some(1.0));
    Ok(())
}

/// A tag invoked several times evaluates against its last record
#[tokio::test]
async fn test_repeated_tags_evaluate_the_last_call() -> RetraceResult<()> {
    let spec = CallSpec::new("Draft.revise")
        .param("attempt", CaptureMode::Trace)
        .returns(CaptureMode::Trace);
    let session = Session::new("helpdesk", "turn-2");
    session
        .scope(async {
            for attempt in 1..=3u32 {
                spec.invoke((attempt,), |(attempt,)| async move {
                    Ok::<_, RetraceError>(format!("draft v{attempt}"))
                })
                .await?;
            }
            Ok::<_, RetraceError>(())
        })
        .await?;
    assert_eq!(session.records().len(), 3);

    let metric = MetricConfig::new("finalDraft", "string_match")
        .with_query("target", "Draft.revise.return")
        .with_param("expected", json!("v3"));
    let result = Evaluator::new().evaluate(&metric, &session.records());
    assert!(result.success);
    Ok(())
}

/// `$`-queries span the whole session; multiple matches collapse into an
/// array, a single match into its value, none into null
#[tokio::test]
async fn test_json_path_queries_span_tags() -> RetraceResult<()> {
    let search = CallSpec::new("Tool.search")
        .param("query", CaptureMode::Trace)
        .returns(CaptureMode::Trace);
    let rerank = CallSpec::new("Tool.rerank")
        .param("query", CaptureMode::Trace)
        .returns(CaptureMode::Trace);
    let session = Session::new("helpdesk", "turn-3");
    session
        .scope(async {
            search
                .invoke(("parcels".to_string(),), |(query,)| async move {
                    capture_var("hits", &5);
                    Ok::<_, RetraceError>(query)
                })
                .await?;
            rerank
                .invoke(("parcels".to_string(),), |(query,)| async move {
                    capture_var("hits", &2);
                    Ok::<_, RetraceError>(query)
                })
                .await?;
            Ok::<_, RetraceError>(())
        })
        .await?;

    let context = TagContext::from_records(&session.records());
    assert_eq!(context.resolve("$['Tool.search'].vars.hits.value"), json!(5));

    let many = context.resolve("$..hits.value");
    let many = many.as_array().cloned().unwrap_or_default();
    assert_eq!(many.len(), 2);
    assert!(many.contains(&json!(5)));
    assert!(many.contains(&json!(2)));

    assert_eq!(context.resolve("$..nonexistent"), Value::Null);
    Ok(())
}

struct MinWordCount;

impl EvalStrategy for MinWordCount {
    fn name(&self) -> &'static str {
        "min_words"
    }

    fn evaluate(
        &self,
        metric: &MetricConfig,
        inputs: &BTreeMap<String, Value>,
    ) -> EvaluationResult {
        let text = match inputs.get("target") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let words = text.split_whitespace().count();
        let min = metric.param_f64("min").unwrap_or(1.0) as usize;
        EvaluationResult::scored(&metric.name, words >= min, words as f64)
    }
}

/// Custom strategies extend one evaluator without leaking into others
#[tokio::test]
async fn test_custom_strategies_stay_per_evaluator() -> RetraceResult<()> {
    let session = Session::new("helpdesk", "turn-4");
    run_support_turn(&session).await?;

    let metric = MetricConfig::new("longEnough", "min_words")
        .with_query("target", "Support.respond.return")
        .with_param("min", json!(5));

    let extended = Evaluator::new().with_strategy(Arc::new(MinWordCount));
    let result = extended.evaluate(&metric, &session.records());
    assert!(result.success);
    assert!(result.score.is_some_and(|score| score >= 5.0));

    // a plain evaluator has no such methodology and degrades the metric
    let plain = Evaluator::new().evaluate(&metric, &session.records());
    assert!(!plain.success);
    assert!(plain.error.is_some_and(|error| error.contains("min_words")));
    Ok(())
}

/// Suites round-trip through the config store as plain JSON arrays and
/// evaluate identically after a fetch
#[tokio::test]
async fn test_stored_suites_round_trip() -> RetraceResult<()> {
    let session = Session::new("helpdesk", "turn-5");
    run_support_turn(&session).await?;

    // the raw wire shape a dashboard would publish
    let raw = json!([
        {
            "name": "categorized",
            "methodology": "string_match",
            "query": {"target": "Support.classify.return"},
            "params": {"expected": "shipping"}
        },
        {
            "name": "apologetic",
            "methodology": "QAG",
            "query": {"answer": "Support.respond.return"},
            "params": {"keywords": ["sorry", "refund"]}
        }
    ]);
    let suite: EvalConfig = serde_json::from_value(raw)?;

    let store = MemoryStore::new();
    let version = store.put_config("helpdesk", &suite).await?;
    assert_eq!(version, 1);

    let fetched = store
        .get_config("helpdesk", VersionSelector::Latest)
        .await?
        .ok_or_else(|| RetraceError::not_found("no stored suite"))?;
    assert_eq!(fetched.version, 1);
    assert_eq!(fetched.config, suite);

    let evaluator = Evaluator::new();
    let records = session.records();
    let direct = evaluator.evaluate_all(&suite.metrics, &records);
    let via_store = evaluator.evaluate_all(&fetched.config.metrics, &records);
    assert_eq!(direct, via_store);
    assert!(via_store.iter().all(|r| r.success));
    Ok(())
}
