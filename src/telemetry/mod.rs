//! Execution telemetry: per-attempt records and run summaries

pub mod aggregator;
pub mod pricing;
pub mod record;
pub mod summary;

pub use aggregator::{summarize, TelemetryAggregator};
pub use record::{AttemptStatus, ExecutionRecord, StepTelemetry, TokenUsage};
pub use summary::{ExecutionSummary, StepSummary};
