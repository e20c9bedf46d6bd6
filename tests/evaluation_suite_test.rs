//! End-to-end metric evaluation over captured sessions
//!
//! Runs a small instrumented "agent" once, then scores the captured
//! records with declarative metric suites: inline, published-latest, and
//! pinned versions.

use retrace::{
    CallSpec, CaptureMode, EvalConfig, EvalSelector, MetricConfig, ReplayError, RetraceClient,
    RunOptions, capture_var,
};
use serde_json::json;

/// Three instrumented calls shaped like a plan/search/answer agent turn
async fn run_agent_turn() {
    let plan = CallSpec::new("Agent.plan").param("question", CaptureMode::Trace);
    plan.invoke(("how is the cache warmed?".to_string(),), |(_q,)| async {
        Ok::<_, ReplayError>(vec![
            "retrieve documents".to_string(),
            "rank results".to_string(),
            "answer the question".to_string(),
        ])
    })
    .await
    .unwrap();

    let search = CallSpec::new("Tool.search").param("query", CaptureMode::Trace);
    search
        .invoke(("cache warmup".to_string(),), |(query,)| async move {
            capture_var("hits", &3);
            Ok::<_, ReplayError>(format!("results for {query}"))
        })
        .await
        .unwrap();

    let answer = CallSpec::new("Agent.answer");
    answer
        .invoke((), |()| async {
            Ok::<_, ReplayError>(
                "The cache is warmed from the snapshot before serving traffic.".to_string(),
            )
        })
        .await
        .unwrap();
}

fn agent_suite() -> EvalConfig {
    EvalConfig::new(vec![
        MetricConfig::new("hasAnswer", "string_match")
            .with_query("target", "Agent.answer.return")
            .with_param("expected", json!("warmed")),
        MetricConfig::new("grounded", "QAG")
            .with_query("answer", "Agent.answer.return")
            .with_param("reference", json!("cache warmed snapshot serving")),
        MetricConfig::new("followsPlan", "DAG")
            .with_query("target", "Agent.plan.return")
            .with_param("steps", json!(["retrieve", "rank", "answer"])),
    ])
}

#[tokio::test]
async fn test_inline_suite_scores_a_live_run() {
    let client = RetraceClient::in_memory("demo");
    let run = client
        .run_session(
            RunOptions::new()
                .with_session("turn-1")
                .with_eval(EvalSelector::Inline(agent_suite())),
            run_agent_turn(),
        )
        .await
        .unwrap();

    assert_eq!(run.records.len(), 3);
    assert_eq!(run.evaluations.len(), 3);
    assert!(run.passed(), "evaluations: {:?}", run.evaluations);
    // result order follows suite order
    assert_eq!(run.evaluations[0].metric, "hasAnswer");
    assert_eq!(run.evaluations[1].metric, "grounded");
    assert_eq!(run.evaluations[2].metric, "followsPlan");
    assert_eq!(run.evaluations[2].score, Some(1.0));
}

#[tokio::test]
async fn test_stored_session_reevaluates_identically() {
    let client = RetraceClient::in_memory("demo");
    let run = client
        .run_session(
            RunOptions::new()
                .with_session("turn-1")
                .with_eval(EvalSelector::Inline(agent_suite())),
            run_agent_turn(),
        )
        .await
        .unwrap();

    // Evaluation is a pure function of the stored records.
    let again = client
        .evaluate_session("turn-1", EvalSelector::Inline(agent_suite()))
        .await
        .unwrap();
    assert_eq!(run.evaluations, again);
}

#[tokio::test]
async fn test_jsonpath_and_dotted_queries_hit_the_same_payloads() {
    let client = RetraceClient::in_memory("demo");
    let suite = EvalConfig::new(vec![
        MetricConfig::new("searchedCache", "string_match")
            .with_query("target", "Tool.search.args.query")
            .with_param("expected", json!("cache")),
        MetricConfig::new("gotHits", "string_match")
            .with_query("target", "$['Tool.search'].vars.hits.value")
            .with_param("expected", json!("3")),
    ]);

    let run = client
        .run_session(
            RunOptions::new().with_eval(EvalSelector::Inline(suite)),
            run_agent_turn(),
        )
        .await
        .unwrap();
    assert!(run.passed(), "evaluations: {:?}", run.evaluations);
}

#[tokio::test]
async fn test_published_versions_pin_their_suites() {
    let client = RetraceClient::in_memory("demo");

    // v1 demands a word the answer never contains, v2 relaxes it.
    let strict = EvalConfig::new(vec![
        MetricConfig::new("hasAnswer", "string_match")
            .with_query("target", "Agent.answer.return")
            .with_param("expected", json!("unobtainium")),
    ]);
    let loose = EvalConfig::new(vec![
        MetricConfig::new("hasAnswer", "string_match")
            .with_query("target", "Agent.answer.return")
            .with_param("expected", json!("warmed")),
    ]);
    assert_eq!(client.publish_config(&strict).await.unwrap(), 1);
    assert_eq!(client.publish_config(&loose).await.unwrap(), 2);

    client
        .run_session(RunOptions::new().with_session("turn-1"), run_agent_turn())
        .await
        .unwrap();

    let pinned = client
        .evaluate_session("turn-1", EvalSelector::Version(1))
        .await
        .unwrap();
    assert!(!pinned[0].success);

    let latest = client
        .evaluate_session("turn-1", EvalSelector::Latest)
        .await
        .unwrap();
    assert!(latest[0].success);
}

#[tokio::test]
async fn test_unknown_methodology_fails_that_metric_only() {
    let client = RetraceClient::in_memory("demo");
    let suite = EvalConfig::new(vec![
        MetricConfig::new("mystery", "llm_judge"),
        MetricConfig::new("hasAnswer", "string_match")
            .with_query("target", "Agent.answer.return")
            .with_param("expected", json!("warmed")),
    ]);

    let run = client
        .run_session(
            RunOptions::new().with_eval(EvalSelector::Inline(suite)),
            run_agent_turn(),
        )
        .await
        .unwrap();

    assert!(!run.passed());
    let mystery = run.evaluation("mystery").unwrap();
    assert!(!mystery.success);
    assert!(mystery.error.as_ref().unwrap().contains("llm_judge"));
    assert!(run.evaluation("hasAnswer").unwrap().success);
}

#[tokio::test]
async fn test_metrics_over_missing_tags_degrade_not_panic() {
    let client = RetraceClient::in_memory("demo");
    let suite = EvalConfig::new(vec![
        // resolves to null, so there is nothing to contain the text
        MetricConfig::new("neverRan", "string_match")
            .with_query("target", "Ghost.call.return")
            .with_param("expected", json!("anything")),
        // no expected strings at all passes vacuously even against null
        MetricConfig::new("vacuous", "string_match").with_query("target", "Ghost.call.return"),
    ]);

    let run = client
        .run_session(
            RunOptions::new()
                .with_session("empty")
                .with_eval(EvalSelector::Inline(suite)),
            async {},
        )
        .await
        .unwrap();

    assert!(run.records.is_empty());
    assert!(!run.evaluations[0].success);
    assert_eq!(run.evaluations[0].score, Some(0.0));
    assert!(run.evaluations[1].success);
}
