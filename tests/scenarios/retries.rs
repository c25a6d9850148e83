//! Test: transient backend failures and the retry budget

use crate::helpers::*;
use scrapegraph::telemetry::AttemptStatus;
use scrapegraph::{CsvScraperGraph, PipelineError, ScraperGraph};
use std::sync::Arc;

fn csv_graph(generator: Arc<MockGenerator>) -> CsvScraperGraph {
    CsvScraperGraph::with_backends(
        LAST_NAMES_PROMPT,
        people_table(),
        test_config(),
        backends(generator, Arc::new(CountingDetector::missing())),
    )
    .unwrap()
}

/// Two rate limits, then an answer: three ask_model attempts
#[tokio::test]
async fn test_rate_limit_is_retried() {
    let generator = Arc::new(MockGenerator::new(vec![
        Reply::RateLimited,
        Reply::RateLimited,
        Reply::text(LAST_NAMES_REPLY),
    ]));
    let mut graph = csv_graph(generator.clone());

    let result = graph.run().await.unwrap();

    assert_eq!(result["last_names"][1], "Smith");
    assert_eq!(generator.calls(), 3);

    let info = graph.get_execution_info();
    assert_counts(&info, 4, 2, 0);
    let ask = info.step("ask_model").unwrap();
    assert_eq!(ask.attempts, 3);
    assert_eq!(ask.last_status, AttemptStatus::Success);
    // Only the successful call reported usage
    assert_eq!(ask.successful_requests, 1);
    assert_eq!(ask.usage.total_tokens, 120);
}

/// A persistent 503 exhausts the budget: 1 attempt + 3 retries
#[tokio::test]
async fn test_persistent_server_error_exhausts_retries() {
    let generator = Arc::new(MockGenerator::new(vec![Reply::Status(503); 8]));
    let mut graph = csv_graph(generator.clone());

    let err = graph.run().await.unwrap_err();

    match &err {
        PipelineError::TransientBackend { step, attempts, .. } => {
            assert_eq!(step, "ask_model");
            assert_eq!(*attempts, 4);
        }
        other => panic!("expected TransientBackend, got {other:?}"),
    }
    assert_eq!(generator.calls(), 4);

    // Telemetry of the failed run is still available
    let info = graph.get_execution_info();
    assert_counts(&info, 2, 3, 1);
    assert_eq!(info.step("ask_model").unwrap().last_status, AttemptStatus::Failed);
    assert!(graph.final_state().unwrap().get("answer").is_none());
}

/// Client errors are not retried
#[tokio::test]
async fn test_unauthorized_fails_immediately() {
    let generator = Arc::new(MockGenerator::new(vec![
        Reply::Status(401),
        Reply::text(LAST_NAMES_REPLY),
    ]));
    let mut graph = csv_graph(generator.clone());

    let err = graph.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::StepFailed { ref step, .. } if step == "ask_model"));
    assert_eq!(generator.calls(), 1);
    let info = graph.get_execution_info();
    assert_counts(&info, 2, 0, 1);
    assert_eq!(info.step("ask_model").unwrap().attempts, 1);
}

/// A lower engine budget applies to every step
#[tokio::test]
async fn test_engine_retry_budget_is_configurable() {
    let generator = Arc::new(MockGenerator::new(vec![Reply::RateLimited; 8]));
    let mut config = test_config();
    config.engine.max_retries = 1;
    let mut graph = CsvScraperGraph::with_backends(
        LAST_NAMES_PROMPT,
        people_table(),
        config,
        backends(generator.clone(), Arc::new(CountingDetector::missing())),
    )
    .unwrap();

    let err = graph.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::TransientBackend { attempts: 2, .. }));
    assert_eq!(generator.calls(), 2);
}
