//! Step executor - runs one step with bounded retry

use crate::{
    core::{
        config::EngineConfig,
        state::{RunState, State, StepState},
        step::{Step, StepOutput},
    },
    error::{PipelineError, Result},
    execution::events::{EventBus, ExecutionEvent},
    telemetry::{AttemptStatus, ExecutionRecord},
};
use chrono::Utc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// A step that finished successfully
#[derive(Debug, Clone)]
pub struct StepOutcome {
    pub output: StepOutput,
    /// Attempts used, including the successful one
    pub attempts: u32,
}

/// Executes a single step, retrying transient failures
#[derive(Debug, Clone)]
pub struct StepExecutor {
    config: EngineConfig,
    events: EventBus,
}

impl StepExecutor {
    pub fn new(config: EngineConfig, events: EventBus) -> Self {
        Self { config, events }
    }

    /// Run `step` against `state`, appending one record per attempt
    ///
    /// Transient failures are retried up to the step's ceiling (or the
    /// engine default) with exponential backoff, waiting at least as long as
    /// a rate-limited backend asked for. Anything else aborts
    /// immediately, tagged with the step name.
    pub async fn execute(
        &self,
        step: &Step,
        state: &State,
        records: &mut Vec<ExecutionRecord>,
        run_state: &mut RunState,
    ) -> Result<StepOutcome> {
        let max_retries = step.max_retries.unwrap_or(self.config.max_retries);
        let mut attempt = 0;

        loop {
            attempt += 1;
            info!("Executing step: {} (attempt {})", step.name, attempt);
            run_state.transition(StepState::Running {
                step: step.name.clone(),
                attempt,
            });
            self.events.emit(ExecutionEvent::StepStarted {
                step: step.name.clone(),
                attempt,
            });

            let started_at = Utc::now();
            let clock = Instant::now();
            let result = step.execute(state).await;
            let duration = clock.elapsed();

            match result {
                Ok(output) => {
                    let missing: Vec<String> = step
                        .outputs
                        .iter()
                        .filter(|key| !output.values.contains_key(key.as_str()))
                        .cloned()
                        .collect();

                    if !missing.is_empty() {
                        let err = PipelineError::OutputContract {
                            step: step.name.clone(),
                            missing,
                        };
                        error!("{}", err);
                        records.push(ExecutionRecord::failure(
                            &step.name,
                            attempt,
                            started_at,
                            duration,
                            AttemptStatus::Failed,
                            err.to_string(),
                        ));
                        return Err(err);
                    }

                    debug!("Step {} finished in {:?}", step.name, duration);
                    records.push(ExecutionRecord::success(
                        &step.name,
                        attempt,
                        started_at,
                        duration,
                        &output.telemetry,
                    ));
                    return Ok(StepOutcome {
                        output,
                        attempts: attempt,
                    });
                }
                Err(err) if err.is_transient() && attempt <= max_retries => {
                    let backoff = self
                        .config
                        .backoff_for(attempt)
                        .max(err.retry_after().unwrap_or_default());
                    warn!(
                        "Step {} failed transiently (attempt {}/{}), retrying in {:?}: {}",
                        step.name,
                        attempt,
                        max_retries + 1,
                        backoff,
                        err
                    );
                    records.push(ExecutionRecord::failure(
                        &step.name,
                        attempt,
                        started_at,
                        duration,
                        AttemptStatus::Retried,
                        err.to_string(),
                    ));
                    self.events.emit(ExecutionEvent::StepRetrying {
                        step: step.name.clone(),
                        attempt,
                        max_retries,
                        backoff,
                        error: err.to_string(),
                    });
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    error!("Step {} failed on attempt {}: {}", step.name, attempt, err);
                    records.push(ExecutionRecord::failure(
                        &step.name,
                        attempt,
                        started_at,
                        duration,
                        AttemptStatus::Failed,
                        err.to_string(),
                    ));
                    return Err(PipelineError::from_step(&step.name, err, attempt));
                }
            }
        }
    }
}
