//! Test: fatal failures and source validation

use crate::helpers::*;
use scrapegraph::telemetry::AttemptStatus;
use scrapegraph::{
    CsvScraperGraph, Image, ImageScraperGraph, PipelineError, ScraperGraph, Source,
};
use serde_json::json;
use std::sync::Arc;

fn image_graph(generator: Arc<MockGenerator>, detector: Arc<CountingDetector>) -> ImageScraperGraph {
    ImageScraperGraph::with_backends(
        "What is the invoice total?",
        Image::from_path("invoice.png"),
        test_config(),
        backends(generator, detector),
    )
    .unwrap()
}

/// Missing OCR backend: one failed record, no retries, no model call
#[tokio::test]
async fn test_missing_ocr_is_fatal() {
    let generator = Arc::new(MockGenerator::always(r#"{"total": "12.50"}"#));
    let detector = Arc::new(CountingDetector::missing());
    let mut graph = image_graph(generator.clone(), detector.clone());

    let err = graph.run().await.unwrap_err();

    match &err {
        PipelineError::DependencyMissing {
            step, capability, hint,
        } => {
            assert_eq!(step, "detect_text");
            assert_eq!(capability, "OCR text detection");
            assert!(hint.contains("tesseract"));
        }
        other => panic!("expected DependencyMissing, got {other:?}"),
    }
    assert_eq!(detector.calls(), 1);
    assert_eq!(generator.calls(), 0);

    let info = graph.get_execution_info();
    assert_counts(&info, 0, 0, 1);
    assert_eq!(info.step("detect_text").unwrap().last_status, AttemptStatus::Failed);
}

/// Detected text flows into the model prompt
#[tokio::test]
async fn test_image_graph_answers_from_detected_text() {
    let generator = Arc::new(MockGenerator::always(r#"{"total": "12.50"}"#));
    let detector = Arc::new(CountingDetector::text("INVOICE\nTotal: 12.50 EUR"));
    let mut graph = image_graph(generator.clone(), detector);

    let result = graph.run().await.unwrap();

    assert_eq!(result, json!({"total": "12.50"}));
    assert!(generator.prompts()[0].contains("Total: 12.50 EUR"));
    assert_eq!(
        step_order(&graph.get_execution_info()),
        vec!["detect_text", "ask_model", "format"]
    );
}

/// Graphs refuse sources they cannot read
#[test]
fn test_source_kind_is_checked_at_construction() {
    let generator = Arc::new(MockGenerator::always("{}"));
    let err = CsvScraperGraph::with_backends(
        LAST_NAMES_PROMPT,
        Image::from_path("people.png"),
        test_config(),
        backends(generator.clone(), Arc::new(CountingDetector::missing())),
    )
    .unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));

    let err = ImageScraperGraph::with_backends(
        LAST_NAMES_PROMPT,
        people_table(),
        test_config(),
        backends(generator, Arc::new(CountingDetector::missing())),
    )
    .unwrap_err();
    assert!(err.is_configuration());
}

/// A text source skips the table rendering
#[tokio::test]
async fn test_csv_graph_accepts_text_source() {
    let generator = Arc::new(MockGenerator::always(LAST_NAMES_REPLY));
    let mut graph = CsvScraperGraph::with_backends(
        LAST_NAMES_PROMPT,
        Source::text("John Doe, Jane Smith"),
        test_config(),
        backends(generator.clone(), Arc::new(CountingDetector::missing())),
    )
    .unwrap();

    graph.run().await.unwrap();
    assert!(generator.prompts()[0].contains("John Doe, Jane Smith"));
}

/// Unparseable model output is fatal and not retried
#[tokio::test]
async fn test_invalid_json_reply_fails() {
    let generator = Arc::new(MockGenerator::always("Sure! The last names are Doe and Smith."));
    let mut graph = CsvScraperGraph::with_backends(
        LAST_NAMES_PROMPT,
        people_table(),
        test_config(),
        backends(generator.clone(), Arc::new(CountingDetector::missing())),
    )
    .unwrap();

    let err = graph.run().await.unwrap_err();

    match err {
        PipelineError::StepFailed { step, message } => {
            assert_eq!(step, "ask_model");
            assert!(message.contains("not valid JSON"));
        }
        other => panic!("expected StepFailed, got {other:?}"),
    }
    assert_eq!(generator.calls(), 1);
}

/// Invalid configuration is rejected before anything runs
#[test]
fn test_invalid_config_rejected() {
    let mut config = test_config();
    config.llm.temperature = Some(3.5);

    let err = CsvScraperGraph::with_backends(
        LAST_NAMES_PROMPT,
        people_table(),
        config,
        backends(
            Arc::new(MockGenerator::always("{}")),
            Arc::new(CountingDetector::missing()),
        ),
    )
    .unwrap_err();
    assert!(err.to_string().contains("temperature"));
}
