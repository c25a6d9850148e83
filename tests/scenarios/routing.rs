//! Test: conditional routing after ask_model

use crate::helpers::*;
use scrapegraph::{CsvScraperGraph, ExecutionEvent, ScraperGraph};
use serde_json::json;
use std::sync::{Arc, Mutex};

fn csv_graph(generator: Arc<MockGenerator>) -> CsvScraperGraph {
    CsvScraperGraph::with_backends(
        LAST_NAMES_PROMPT,
        people_table(),
        test_config(),
        backends(generator, Arc::new(CountingDetector::missing())),
    )
    .unwrap()
}

/// An empty answer routes to retry_prompt, not format
#[tokio::test]
async fn test_empty_answer_routes_to_retry_prompt() {
    let generator = Arc::new(MockGenerator::new(vec![
        Reply::text("{}"),
        Reply::text(LAST_NAMES_REPLY),
    ]));
    let mut graph = csv_graph(generator.clone());

    let routes = Arc::new(Mutex::new(Vec::new()));
    let sink = routes.clone();
    graph.on_event(move |event| {
        if let ExecutionEvent::StepRouted { from, to } = event {
            sink.lock().unwrap().push(format!("{from}->{to}"));
        }
    });

    let result = graph.run().await.unwrap();

    assert_eq!(result, json!({"last_names": ["Doe", "Smith"]}));
    assert_eq!(
        *routes.lock().unwrap(),
        vec![
            "load->normalize",
            "normalize->ask_model",
            "ask_model->retry_prompt",
            "retry_prompt->format",
        ]
    );
    assert!(generator.prompts()[1].contains("returned nothing"));
    assert_eq!(
        step_order(&graph.get_execution_info()),
        vec!["load", "normalize", "ask_model", "retry_prompt", "format"]
    );
}

/// A blank reply counts as empty too
#[tokio::test]
async fn test_blank_reply_routes_to_retry_prompt() {
    let generator = Arc::new(MockGenerator::new(vec![
        Reply::text("   "),
        Reply::text(r#"{"last_names": ["Doe"]}"#),
    ]));
    let mut graph = csv_graph(generator.clone());

    graph.run().await.unwrap();

    assert_eq!(generator.calls(), 2);
    assert!(graph.get_execution_info().step("retry_prompt").is_some());
}

/// A non-empty answer goes straight to format
#[tokio::test]
async fn test_answer_skips_retry_prompt() {
    let generator = Arc::new(MockGenerator::always(LAST_NAMES_REPLY));
    let mut graph = csv_graph(generator.clone());

    graph.run().await.unwrap();

    assert_eq!(generator.calls(), 1);
    assert!(graph.get_execution_info().step("retry_prompt").is_none());
}

/// A retry that is still empty formats the empty answer
#[tokio::test]
async fn test_empty_after_retry_yields_empty_result() {
    let generator = Arc::new(MockGenerator::always("{}"));
    let mut graph = csv_graph(generator.clone());

    let result = graph.run().await.unwrap();

    assert_eq!(result, json!({}));
    assert_eq!(generator.calls(), 2);
}

/// A fenced one-line reply is an answer, not an empty result
#[tokio::test]
async fn test_fenced_reply_goes_straight_to_format() {
    let generator = Arc::new(MockGenerator::always(r#"```json {"last_names": ["Doe", "Smith"]}```"#));
    let mut graph = csv_graph(generator.clone());

    let result = graph.run().await.unwrap();

    assert_eq!(result, json!({"last_names": ["Doe", "Smith"]}));
    assert_eq!(generator.calls(), 1);
    assert_eq!(
        step_order(&graph.get_execution_info()),
        vec!["load", "normalize", "ask_model", "format"]
    );
}
