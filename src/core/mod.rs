//! Core domain models
//!
//! Steps, the edges between them, the shared state a run threads through
//! them, and the configuration a graph is built from.

pub mod config;
pub mod edge;
pub mod pipeline;
pub mod state;
pub mod step;

pub use config::{EngineConfig, GraphConfig, LlmConfig, OcrConfig, Provider};
pub use edge::{Branch, Condition, ConditionPattern, Edge};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use state::{is_empty_value, ExecutionStatus, RunState, State, StepState};
pub use step::{FnStep, Step, StepHandler, StepOutput};
