//! Pipeline execution engine

pub mod engine;
pub mod events;
pub mod executor;
pub mod resolver;

pub use engine::{ExecutionEngine, RunFailure, RunResult};
pub use events::{EventBus, EventHandler, ExecutionEvent};
pub use executor::{StepExecutor, StepOutcome};
pub use resolver::EdgeResolver;
