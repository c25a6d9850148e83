//! Step domain model

use crate::{core::state::State, error::StepError, telemetry::StepTelemetry};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// What a step hands back to the engine
#[derive(Debug, Clone, Default)]
pub struct StepOutput {
    /// Values to merge; only the step's declared outputs are kept
    pub values: State,

    /// Token/cost telemetry for model-calling steps
    pub telemetry: StepTelemetry,
}

impl StepOutput {
    pub fn new(values: State) -> Self {
        Self {
            values,
            telemetry: StepTelemetry::default(),
        }
    }

    /// Output carrying a single key
    pub fn single(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(State::new().with(key, value))
    }

    pub fn with_telemetry(mut self, telemetry: StepTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }
}

/// The work a step performs
///
/// Implementations must be idempotent with respect to the keys they write:
/// the engine re-invokes the handler with the same state after a transient
/// failure.
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn execute(&self, state: &State) -> Result<StepOutput, StepError>;
}

/// Adapts a synchronous closure into a [`StepHandler`]
pub struct FnStep<F>(pub F);

#[async_trait]
impl<F> StepHandler for FnStep<F>
where
    F: Fn(&State) -> Result<StepOutput, StepError> + Send + Sync,
{
    async fn execute(&self, state: &State) -> Result<StepOutput, StepError> {
        (self.0)(state)
    }
}

/// A single named step in a pipeline
#[derive(Clone)]
pub struct Step {
    /// Unique step name
    pub name: String,

    /// Keys that must be present before the step may run
    pub inputs: BTreeSet<String>,

    /// Keys the step writes
    pub outputs: BTreeSet<String>,

    /// Per-step retry ceiling (overrides the engine default)
    pub max_retries: Option<u32>,

    handler: Arc<dyn StepHandler>,
}

impl Step {
    pub fn new(name: impl Into<String>, handler: impl StepHandler + 'static) -> Self {
        Self::from_arc(name, Arc::new(handler))
    }

    pub fn from_arc(name: impl Into<String>, handler: Arc<dyn StepHandler>) -> Self {
        Self {
            name: name.into(),
            inputs: BTreeSet::new(),
            outputs: BTreeSet::new(),
            max_retries: None,
            handler,
        }
    }

    /// Step backed by a closure
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&State) -> Result<StepOutput, StepError> + Send + Sync + 'static,
    {
        Self::new(name, FnStep(f))
    }

    pub fn with_inputs<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs = inputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outputs<I, S>(mut self, outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = outputs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Declared inputs absent from `state`
    pub fn missing_inputs(&self, state: &State) -> Vec<String> {
        state.missing_keys(&self.inputs)
    }

    /// Invoke the handler once
    pub async fn execute(&self, state: &State) -> Result<StepOutput, StepError> {
        self.handler.execute(state).await
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}
