//! Run lifecycle shared by every graph facade

use crate::{
    core::{config::GraphConfig, pipeline::Pipeline, state::State},
    error::{PipelineError, Result},
    execution::{ExecutionEngine, ExecutionEvent},
    source::Source,
    steps::keys,
    telemetry::{ExecutionSummary, TelemetryAggregator},
};
use serde_json::Value;
use tracing::info;

/// One pipeline, one seed, one run
///
/// Telemetry survives a failed run so callers can still inspect it.
#[derive(Debug)]
pub struct GraphCore {
    prompt: String,
    source: Source,
    config: GraphConfig,
    pipeline: Pipeline,
    engine: ExecutionEngine,
    telemetry: TelemetryAggregator,
    final_state: Option<State>,
    consumed: bool,
}

impl GraphCore {
    pub fn new(
        prompt: impl Into<String>,
        source: Source,
        config: GraphConfig,
        pipeline: Pipeline,
    ) -> Self {
        let engine = ExecutionEngine::new(config.engine.clone());
        Self {
            prompt: prompt.into(),
            source,
            config,
            pipeline,
            engine,
            telemetry: TelemetryAggregator::new(),
            final_state: None,
            consumed: false,
        }
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    /// Seed state: `{prompt, source, config}`
    pub fn seed(&self) -> Result<State> {
        let source = serde_json::to_value(&self.source)
            .map_err(|e| PipelineError::configuration(format!("unserializable source: {}", e)))?;
        let config = serde_json::to_value(&self.config)
            .map_err(|e| PipelineError::configuration(format!("unserializable config: {}", e)))?;
        Ok(State::new()
            .with(keys::PROMPT, self.prompt.clone())
            .with(keys::SOURCE, source)
            .with(keys::CONFIG, config))
    }

    /// Run the pipeline and return the `result` value
    pub async fn run(&mut self) -> Result<Value> {
        if self.consumed {
            return Err(PipelineError::configuration(format!(
                "graph '{}' has already run; call reset() before running it again",
                self.pipeline.name
            )));
        }
        self.consumed = true;

        let seed = self.seed()?;
        match self
            .engine
            .run_with_telemetry(&self.pipeline, seed, &mut self.telemetry)
            .await
        {
            Ok(run) => {
                let result = run.state.get(keys::RESULT).cloned().unwrap_or(Value::Null);
                info!(
                    "Graph {} finished in {} attempts",
                    self.pipeline.name,
                    run.records.len()
                );
                self.final_state = Some(run.state);
                Ok(result)
            }
            Err(failure) => {
                self.final_state = Some(failure.state);
                Err(failure.error)
            }
        }
    }

    /// Summary of the last run's telemetry
    pub fn summary(&self) -> ExecutionSummary {
        self.telemetry.summary()
    }

    /// State at the end of the last run, successful or not
    pub fn final_state(&self) -> Option<&State> {
        self.final_state.as_ref()
    }

    /// Allow another run, discarding the previous run's telemetry and state
    pub fn reset(&mut self) {
        self.telemetry.clear();
        self.final_state = None;
        self.consumed = false;
    }

    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.engine.add_event_handler(handler);
    }
}
