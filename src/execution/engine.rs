//! Main execution engine - drives one run from the entry step to a terminal step

use crate::{
    core::{
        config::EngineConfig,
        pipeline::Pipeline,
        state::{ExecutionStatus, RunState, State, StepState},
    },
    error::{PipelineError, Result},
    execution::{
        events::{EventBus, ExecutionEvent},
        executor::StepExecutor,
        resolver::EdgeResolver,
    },
    telemetry::{ExecutionRecord, TelemetryAggregator},
};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info};
use uuid::Uuid;

/// A completed run
#[derive(Debug, Clone)]
pub struct RunResult {
    pub run_id: Uuid,
    /// Final state after the terminal step
    pub state: State,
    /// One record per attempt, in execution order
    pub records: Vec<ExecutionRecord>,
    pub run_state: RunState,
}

/// An aborted run, with everything produced before the failure
#[derive(Debug, Clone, Error)]
#[error("run {run_id} aborted: {error}")]
pub struct RunFailure {
    pub run_id: Uuid,
    #[source]
    pub error: PipelineError,
    pub state: State,
    pub records: Vec<ExecutionRecord>,
    pub run_state: RunState,
}

impl RunFailure {
    /// Step the failure is attributed to, if any
    pub fn step(&self) -> Option<&str> {
        self.error.step()
    }
}

/// Main pipeline execution engine
///
/// Holds no per-run state, so one engine can drive any number of
/// concurrent runs over shared pipelines.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    config: EngineConfig,
    run_timeout: Option<Duration>,
    executor: StepExecutor,
    events: EventBus,
}

impl ExecutionEngine {
    pub fn new(config: EngineConfig) -> Self {
        let events = EventBus::new();
        Self {
            run_timeout: config.run_timeout(),
            executor: StepExecutor::new(config.clone(), events.clone()),
            config,
            events,
        }
    }

    /// Override the run-level time budget
    pub fn with_run_timeout(mut self, budget: Duration) -> Self {
        self.run_timeout = Some(budget);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(handler);
    }

    /// Execute `pipeline` starting from `seed`
    pub async fn run(
        &self,
        pipeline: &Pipeline,
        seed: State,
    ) -> std::result::Result<RunResult, RunFailure> {
        let mut run_state = RunState::new();
        let run_id = run_state.run_id;
        let mut state = seed;
        let mut records = Vec::new();

        info!(
            "Starting pipeline run: {} ({}, {} steps)",
            pipeline.name,
            run_id,
            pipeline.len()
        );
        run_state.start();
        self.events.emit(ExecutionEvent::RunStarted {
            run_id,
            pipeline_name: pipeline.name.clone(),
        });

        match self
            .drive(pipeline, &mut state, &mut records, &mut run_state)
            .await
        {
            Ok(()) => {
                run_state.complete();
                info!(
                    "Pipeline run finished: {} - {} steps, {} attempts",
                    pipeline.name,
                    run_state.steps_executed,
                    records.len()
                );
                self.events.emit(ExecutionEvent::RunFinished {
                    run_id,
                    status: ExecutionStatus::Completed,
                });
                Ok(RunResult {
                    run_id,
                    state,
                    records,
                    run_state,
                })
            }
            Err(err) => {
                error!("Pipeline run {} aborted: {}", pipeline.name, err);
                if let Some(step) = err.step() {
                    run_state.transition(StepState::Failed {
                        step: step.to_string(),
                        error: err.to_string(),
                    });
                    self.events.emit(ExecutionEvent::StepFailed {
                        step: step.to_string(),
                        error: err.to_string(),
                    });
                }
                run_state.abort();
                self.events.emit(ExecutionEvent::RunFinished {
                    run_id,
                    status: ExecutionStatus::Aborted,
                });
                Err(RunFailure {
                    run_id,
                    error: err,
                    state,
                    records,
                    run_state,
                })
            }
        }
    }

    /// Like [`run`](Self::run), also pushing every record into `telemetry`
    ///
    /// Records are pushed whether the run completes or aborts.
    pub async fn run_with_telemetry(
        &self,
        pipeline: &Pipeline,
        seed: State,
        telemetry: &mut TelemetryAggregator,
    ) -> std::result::Result<RunResult, RunFailure> {
        let result = self.run(pipeline, seed).await;
        let records = match &result {
            Ok(run) => &run.records,
            Err(failure) => &failure.records,
        };
        for record in records {
            telemetry.record(record.clone());
        }
        result
    }

    async fn drive(
        &self,
        pipeline: &Pipeline,
        state: &mut State,
        records: &mut Vec<ExecutionRecord>,
        run_state: &mut RunState,
    ) -> Result<()> {
        let resolver = EdgeResolver::new(pipeline);
        let clock = Instant::now();
        let mut current = pipeline.entry().to_string();
        let mut step_count = 0usize;

        loop {
            if let Some(budget) = self.run_timeout {
                if clock.elapsed() >= budget {
                    return Err(PipelineError::Timeout {
                        step: current,
                        budget,
                    });
                }
            }

            if step_count >= self.config.max_steps {
                return Err(PipelineError::CycleLimitExceeded {
                    limit: self.config.max_steps,
                });
            }

            let step = pipeline.step(&current).ok_or_else(|| {
                PipelineError::configuration(format!("step '{}' does not exist", current))
            })?;

            run_state.transition(StepState::Pending {
                step: step.name.clone(),
            });

            let missing = step.missing_inputs(state);
            if !missing.is_empty() {
                return Err(PipelineError::MissingInput {
                    step: step.name.clone(),
                    missing,
                });
            }

            let started = Instant::now();
            let outcome = self.executor.execute(step, state, records, run_state).await?;

            let discarded = state.merge_declared(outcome.output.values, &step.outputs);
            if !discarded.is_empty() {
                debug!(
                    "Step {} returned undeclared keys, discarded: {}",
                    step.name,
                    discarded.join(", ")
                );
            }

            run_state.transition(StepState::Succeeded {
                step: step.name.clone(),
                attempts: outcome.attempts,
            });
            self.events.emit(ExecutionEvent::StepSucceeded {
                step: step.name.clone(),
                attempts: outcome.attempts,
                duration: started.elapsed(),
            });
            step_count += 1;

            match resolver.next_step(&current, state)? {
                None => return Ok(()),
                Some(next) => {
                    self.events.emit(ExecutionEvent::StepRouted {
                        from: current.clone(),
                        to: next.to_string(),
                    });
                    current = next.to_string();
                }
            }
        }
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
