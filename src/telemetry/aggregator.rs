//! Collects execution records as the engine produces them

use crate::telemetry::{
    record::{AttemptStatus, ExecutionRecord, TokenUsage},
    summary::{ExecutionSummary, StepSummary},
};
use std::time::Duration;

/// Push-based sink for the records of one run
#[derive(Debug, Clone, Default)]
pub struct TelemetryAggregator {
    records: Vec<ExecutionRecord>,
}

impl TelemetryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record
    pub fn record(&mut self, record: ExecutionRecord) {
        self.records.push(record);
    }

    /// Records in the order they were produced
    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    /// Drop all records (used when a facade is reset)
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Summarize the records; steps without telemetry count as zero-cost
    pub fn summary(&self) -> ExecutionSummary {
        summarize(&self.records)
    }
}

/// Build a summary purely from a record sequence
pub fn summarize(records: &[ExecutionRecord]) -> ExecutionSummary {
    let mut steps: Vec<StepSummary> = Vec::new();
    let mut summary = ExecutionSummary::default();

    for record in records {
        let index = match steps.iter().position(|s| s.step_name == record.step_name) {
            Some(index) => index,
            None => {
                steps.push(StepSummary::new(&record.step_name));
                steps.len() - 1
            }
        };
        let row = &mut steps[index];

        let usage = record.token_usage.unwrap_or_default();
        let cost = record.cost_estimate.unwrap_or(0.0);

        row.attempts += 1;
        row.duration += record.duration;
        row.usage += usage;
        row.cost_usd += cost;
        row.successful_requests += record.successful_requests;
        row.last_status = record.status;

        match record.status {
            AttemptStatus::Success => summary.successes += 1,
            AttemptStatus::Retried => summary.retries += 1,
            AttemptStatus::Failed => summary.failures += 1,
        }
    }

    summary.total_duration = steps.iter().map(|s| s.duration).sum::<Duration>();
    summary.total_usage = steps.iter().fold(TokenUsage::default(), |mut acc, s| {
        acc += s.usage;
        acc
    });
    summary.total_cost_usd = steps.iter().map(|s| s.cost_usd).sum();
    summary.total_requests = steps.iter().map(|s| s.successful_requests).sum();
    summary.steps = steps;
    summary
}
