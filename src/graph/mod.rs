//! Scraper graph facades
//!
//! A graph wires concrete steps into a pipeline, seeds the state from a
//! prompt, a source and a configuration, and exposes the run result plus its
//! execution summary.

pub mod base;
pub mod csv;
pub mod image;

pub use base::GraphCore;
pub use csv::CsvScraperGraph;
pub use image::ImageScraperGraph;

use crate::{
    core::{
        edge::{Branch, Condition},
        state::State,
    },
    error::Result,
    execution::ExecutionEvent,
    steps::keys,
    telemetry::ExecutionSummary,
};
use async_trait::async_trait;
use serde_json::Value;

/// Common interface of the graph facades
#[async_trait]
pub trait ScraperGraph: Send {
    fn core(&self) -> &GraphCore;

    fn core_mut(&mut self) -> &mut GraphCore;

    /// Execute the graph once and return the extracted value
    async fn run(&mut self) -> Result<Value> {
        self.core_mut().run().await
    }

    /// Execution summary of the last run (also after a failed run)
    fn get_execution_info(&self) -> ExecutionSummary {
        self.core().summary()
    }

    fn final_state(&self) -> Option<&State> {
        self.core().final_state()
    }

    fn reset(&mut self) {
        self.core_mut().reset()
    }

    fn on_event<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
        Self: Sized,
    {
        self.core().add_event_handler(handler)
    }
}

impl ScraperGraph for GraphCore {
    fn core(&self) -> &GraphCore {
        self
    }

    fn core_mut(&mut self) -> &mut GraphCore {
        self
    }
}

/// Branches after `ask_model`: re-ask on an empty answer, else format
pub(crate) fn answer_branches() -> (Vec<Branch>, Option<String>) {
    (
        vec![Branch::new("retry_prompt", Condition::empty(keys::ANSWER))],
        Some("format".to_string()),
    )
}
