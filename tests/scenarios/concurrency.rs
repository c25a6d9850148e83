//! Test: independent runs sharing one backend

use crate::helpers::*;
use scrapegraph::{CsvScraperGraph, ScraperGraph, Table};
use serde_json::json;
use std::sync::Arc;

fn graph(prompt: &str, table: Table, generator: Arc<MockGenerator>) -> CsvScraperGraph {
    CsvScraperGraph::with_backends(
        prompt,
        table,
        test_config(),
        backends(generator, Arc::new(CountingDetector::missing())),
    )
    .unwrap()
}

/// Two runs at once keep their own result, state and records
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_runs_are_isolated() {
    let generator = Arc::new(MockGenerator::by_prompt(&[
        ("John Doe", LAST_NAMES_REPLY),
        ("Ada Lovelace", r#"{"first_names": ["Ada", "Grace"]}"#),
    ]));
    let scientists = Table::from_csv("name\nAda Lovelace\nGrace Hopper\n").unwrap();

    let mut people = graph(LAST_NAMES_PROMPT, people_table(), generator.clone());
    let mut pioneers = graph("List me all the first names", scientists, generator.clone());

    let (people_result, pioneers_result) = tokio::join!(people.run(), pioneers.run());

    assert_eq!(people_result.unwrap(), json!({"last_names": ["Doe", "Smith"]}));
    assert_eq!(pioneers_result.unwrap(), json!({"first_names": ["Ada", "Grace"]}));
    assert_eq!(generator.calls(), 2);

    let people_state = people.final_state().unwrap();
    let pioneers_state = pioneers.final_state().unwrap();
    assert_eq!(people_state.get_str("prompt"), Some(LAST_NAMES_PROMPT));
    assert_eq!(pioneers_state.get_str("prompt"), Some("List me all the first names"));
    assert!(people_state.get_str("document").unwrap().contains("John Doe"));
    assert!(!people_state.get_str("document").unwrap().contains("Ada"));
    assert!(pioneers_state.get_str("document").unwrap().contains("Grace Hopper"));

    for info in [people.get_execution_info(), pioneers.get_execution_info()] {
        assert_eq!(info.record_count(), 4);
        assert_counts(&info, 4, 0, 0);
        assert_eq!(info.total_requests, 1);
        assert_eq!(info.total_usage.total_tokens, 120);
        assert_eq!(step_order(&info), vec!["load", "normalize", "ask_model", "format"]);
    }
}

/// The same graph definition run twice in parallel from separate instances
#[tokio::test]
async fn test_parallel_runs_of_one_definition() {
    let generator = Arc::new(MockGenerator::always(LAST_NAMES_REPLY));
    let mut first = graph(LAST_NAMES_PROMPT, people_table(), generator.clone());
    let mut second = graph(LAST_NAMES_PROMPT, people_table(), generator.clone());

    let (a, b) = tokio::join!(first.run(), second.run());

    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(first.get_execution_info().record_count(), 4);
    assert_eq!(second.get_execution_info().record_count(), 4);
    assert_eq!(generator.calls(), 2);
}
