//! Error taxonomy for pipeline runs
//!
//! Steps fail with [`StepError`], which carries just enough classification for
//! the engine to decide between retrying and aborting. The engine turns every
//! unresolved step failure into a [`PipelineError`] tagged with the step name.

use crate::backend::BackendError;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a step handler
#[derive(Debug, Clone, Error)]
pub enum StepError {
    /// Safe to retry (rate limit, timeout, dropped connection)
    #[error("transient failure: {0}")]
    Transient(String),

    /// Rate limited; the backend asked for a minimum wait before retrying
    #[error("rate limited, retry after {retry_after:?}: {message}")]
    Throttled {
        message: String,
        retry_after: Duration,
    },

    /// Retrying will not help
    #[error("{0}")]
    Fatal(String),

    /// An optional backend is not installed
    #[error("{capability} is not available. {hint}")]
    DependencyMissing { capability: String, hint: String },
}

impl StepError {
    pub fn transient(message: impl Into<String>) -> Self {
        StepError::Transient(message.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        StepError::Fatal(message.into())
    }

    /// Whether the engine may retry the step after this error
    pub fn is_transient(&self) -> bool {
        matches!(self, StepError::Transient(_) | StepError::Throttled { .. })
    }

    /// Minimum delay the backend asked for before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            StepError::Throttled { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }
}

impl From<BackendError> for StepError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::DependencyMissing { capability, hint } => {
                StepError::DependencyMissing { capability, hint }
            }
            BackendError::RateLimited {
                retry_after_secs: Some(secs),
                ..
            } => StepError::Throttled {
                message: err.to_string(),
                retry_after: Duration::from_secs(secs),
            },
            err if err.is_transient() => StepError::Transient(err.to_string()),
            err => StepError::Fatal(err.to_string()),
        }
    }
}

/// Fatal error that aborts a run
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// Invalid topology or configuration, detected before or during assembly
    #[error("invalid pipeline configuration: {0}")]
    Configuration(String),

    /// A conditional edge had no branch for the current state
    #[error("step '{step}' has no route for the current state")]
    UnroutableState { step: String },

    /// A step was reached before its declared inputs were written
    #[error("step '{step}' is missing required inputs: {}", missing.join(", "))]
    MissingInput { step: String, missing: Vec<String> },

    /// A step returned without writing every key it declared
    #[error("step '{step}' did not produce declared outputs: {}", missing.join(", "))]
    OutputContract { step: String, missing: Vec<String> },

    /// Transient failures persisted past the retry ceiling
    #[error("step '{step}' failed after {attempts} attempts: {message}")]
    TransientBackend {
        step: String,
        attempts: u32,
        message: String,
    },

    /// An optional backend library or binary is not installed
    #[error("step '{step}': {capability} is not available. {hint}")]
    DependencyMissing {
        step: String,
        capability: String,
        hint: String,
    },

    /// Safety valve against conditional edges that never reach a terminal step
    #[error("run exceeded the limit of {limit} steps")]
    CycleLimitExceeded { limit: usize },

    /// Run-level time budget exhausted before starting `step`
    #[error("run exceeded its time budget of {budget:?} before step '{step}'")]
    Timeout { step: String, budget: Duration },

    /// Non-transient step failure
    #[error("step '{step}' failed: {message}")]
    StepFailed { step: String, message: String },
}

impl PipelineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        PipelineError::Configuration(message.into())
    }

    /// Tag a step failure with the name of the failing step
    pub fn from_step(step: &str, err: StepError, attempts: u32) -> Self {
        match err {
            StepError::Transient(message) | StepError::Throttled { message, .. } => {
                PipelineError::TransientBackend {
                    step: step.to_string(),
                    attempts,
                    message,
                }
            }
            StepError::Fatal(message) => PipelineError::StepFailed {
                step: step.to_string(),
                message,
            },
            StepError::DependencyMissing { capability, hint } => {
                PipelineError::DependencyMissing {
                    step: step.to_string(),
                    capability,
                    hint,
                }
            }
        }
    }

    /// Name of the step the error is attributed to, if any
    pub fn step(&self) -> Option<&str> {
        match self {
            PipelineError::UnroutableState { step }
            | PipelineError::MissingInput { step, .. }
            | PipelineError::OutputContract { step, .. }
            | PipelineError::TransientBackend { step, .. }
            | PipelineError::DependencyMissing { step, .. }
            | PipelineError::Timeout { step, .. }
            | PipelineError::StepFailed { step, .. } => Some(step),
            PipelineError::Configuration(_) | PipelineError::CycleLimitExceeded { .. } => None,
        }
    }

    /// Configuration bugs (bad topology, unroutable state)
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            PipelineError::Configuration(_) | PipelineError::UnroutableState { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
