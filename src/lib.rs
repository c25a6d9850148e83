//! scrapegraph - extract-then-answer pipelines over tables and images

pub mod backend;
pub mod cli;
pub mod convert;
pub mod core;
pub mod error;
pub mod execution;
pub mod graph;
pub mod prompts;
pub mod source;
pub mod steps;
pub mod telemetry;

// Re-export commonly used types
pub use backend::{
    detect_text, BackendError, Backends, Generation, GenerationRequest, Image,
    OpenAiCompatibleClient, TesseractDetector, TextDetector, TextGenerator,
};
pub use core::{
    Branch, Condition, ConditionPattern, Edge, EngineConfig, ExecutionStatus, GraphConfig,
    LlmConfig, OcrConfig, Pipeline, PipelineBuilder, Provider, State, Step, StepHandler,
    StepOutput,
};
pub use error::{PipelineError, StepError};
pub use execution::{ExecutionEngine, ExecutionEvent, RunFailure, RunResult};
pub use graph::{CsvScraperGraph, GraphCore, ImageScraperGraph, ScraperGraph};
pub use source::{Source, Table};
pub use telemetry::{ExecutionRecord, ExecutionSummary, TelemetryAggregator, TokenUsage};
