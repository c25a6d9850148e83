//! Test: the last-names extraction over a two-row table

use crate::helpers::*;
use scrapegraph::steps::{keys, AskModelStep, FormatStep, LoadStep};
use scrapegraph::{
    CsvScraperGraph, GraphCore, Pipeline, PipelineError, ScraperGraph, Source, Step,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn three_step_graph(generator: Arc<MockGenerator>) -> GraphCore {
    let pipeline = Pipeline::builder("last_names")
        .step(
            Step::new("load", LoadStep)
                .with_inputs([keys::SOURCE])
                .with_outputs([keys::DOCUMENT]),
        )
        .step(
            Step::new("ask_model", AskModelStep::new(generator).reading(keys::DOCUMENT))
                .with_inputs([keys::PROMPT, keys::DOCUMENT])
                .with_outputs([keys::ANSWER]),
        )
        .step(
            Step::new("format", FormatStep)
                .with_inputs([keys::ANSWER])
                .with_outputs([keys::RESULT]),
        )
        .edge("load", "ask_model")
        .edge("ask_model", "format")
        .build()
        .unwrap();

    GraphCore::new(
        LAST_NAMES_PROMPT,
        Source::from(people_table()),
        test_config(),
        pipeline,
    )
}

/// load -> ask_model -> format yields the model mapping and three records
#[tokio::test]
async fn test_three_step_last_names() {
    let generator = Arc::new(MockGenerator::always(LAST_NAMES_REPLY));
    let mut graph = three_step_graph(generator.clone());

    let result = graph.run().await.unwrap();

    assert_eq!(result, json!({"last_names": ["Doe", "Smith"]}));
    let info = graph.get_execution_info();
    assert_eq!(info.record_count(), 3);
    assert_counts(&info, 3, 0, 0);
    assert_eq!(step_order(&info), vec!["load", "ask_model", "format"]);
    assert_eq!(generator.calls(), 1);

    // The table reached the model as text
    assert!(generator.prompts()[0].contains("name: Jane Smith"));
}

/// The full CSV graph adds normalize and reports model telemetry
#[tokio::test]
async fn test_csv_graph_last_names() {
    let generator = Arc::new(MockGenerator::always(LAST_NAMES_REPLY));
    let detector = Arc::new(CountingDetector::missing());
    let mut graph = CsvScraperGraph::with_backends(
        LAST_NAMES_PROMPT,
        people_table(),
        test_config(),
        backends(generator.clone(), detector),
    )
    .unwrap();

    let result = graph.run().await.unwrap();
    assert_eq!(result["last_names"], json!(["Doe", "Smith"]));

    let info = graph.get_execution_info();
    assert_eq!(step_order(&info), vec!["load", "normalize", "ask_model", "format"]);
    assert_counts(&info, 4, 0, 0);
    assert_eq!(info.total_usage.total_tokens, 120);
    assert_eq!(info.total_requests, 1);
    // Local models are free
    assert_eq!(info.total_cost_usd, 0.0);
    assert!(info.prettify().contains("ask_model"));
}

/// Seed keys survive; the API key never enters the state
#[tokio::test]
async fn test_final_state_keeps_seed_and_hides_secrets() {
    let generator = Arc::new(MockGenerator::always(LAST_NAMES_REPLY));
    let mut config = test_config();
    config.llm.api_key = Some("sk-very-secret".to_string());

    let mut graph = CsvScraperGraph::with_backends(
        LAST_NAMES_PROMPT,
        people_table(),
        config,
        backends(generator, Arc::new(CountingDetector::missing())),
    )
    .unwrap();
    graph.run().await.unwrap();

    let state = graph.final_state().unwrap();
    let keys: Vec<&String> = state.keys().collect();
    assert_eq!(
        keys,
        vec!["prompt", "source", "config", "document", "chunks", "answer", "result"]
    );
    assert_eq!(state.get_str("prompt"), Some(LAST_NAMES_PROMPT));
    let serialized = serde_json::to_string(state).unwrap();
    assert!(!serialized.contains("sk-very-secret"));
}

/// One instance, one run, until reset
#[tokio::test]
async fn test_second_run_requires_reset() {
    let generator = Arc::new(MockGenerator::always(LAST_NAMES_REPLY));
    let mut graph = three_step_graph(generator.clone());

    graph.run().await.unwrap();
    let err = graph.run().await.unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
    // The rejected run left the previous telemetry alone
    assert_eq!(graph.get_execution_info().record_count(), 3);

    graph.reset();
    assert_eq!(graph.get_execution_info().record_count(), 0);
    let result: Value = graph.run().await.unwrap();
    assert_eq!(result["last_names"][0], "Doe");
    assert_eq!(generator.calls(), 2);
}
