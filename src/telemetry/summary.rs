//! Run-level execution summary

use crate::telemetry::record::{duration_ms, AttemptStatus, TokenUsage};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::time::Duration;

/// Aggregated telemetry for one step across all of its attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSummary {
    pub step_name: String,
    pub attempts: u32,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    pub usage: TokenUsage,
    pub cost_usd: f64,
    pub successful_requests: u32,
    pub last_status: AttemptStatus,
}

impl StepSummary {
    pub(crate) fn new(step_name: &str) -> Self {
        Self {
            step_name: step_name.to_string(),
            attempts: 0,
            duration: Duration::ZERO,
            usage: TokenUsage::default(),
            cost_usd: 0.0,
            successful_requests: 0,
            last_status: AttemptStatus::Success,
        }
    }
}

/// Summary derived from the execution records of one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// One row per step, in order of first execution
    pub steps: Vec<StepSummary>,
    #[serde(with = "duration_ms")]
    pub total_duration: Duration,
    pub total_usage: TokenUsage,
    pub total_cost_usd: f64,
    pub total_requests: u32,
    pub successes: usize,
    pub retries: usize,
    pub failures: usize,
}

impl ExecutionSummary {
    pub fn step(&self, name: &str) -> Option<&StepSummary> {
        self.steps.iter().find(|s| s.step_name == name)
    }

    /// Number of records the summary was built from
    pub fn record_count(&self) -> usize {
        self.successes + self.retries + self.failures
    }

    /// Render the summary as a fixed-width text table with a total row
    pub fn prettify(&self) -> String {
        let headers = [
            "step",
            "attempts",
            "total_tokens",
            "prompt_tokens",
            "completion_tokens",
            "requests",
            "cost_usd",
            "exec_time",
            "status",
        ];

        let mut rows: Vec<[String; 9]> = self
            .steps
            .iter()
            .map(|s| {
                [
                    s.step_name.clone(),
                    s.attempts.to_string(),
                    s.usage.total_tokens.to_string(),
                    s.usage.prompt_tokens.to_string(),
                    s.usage.completion_tokens.to_string(),
                    s.successful_requests.to_string(),
                    format!("{:.6}", s.cost_usd),
                    format_secs(s.duration),
                    status_label(s.last_status).to_string(),
                ]
            })
            .collect();

        rows.push([
            "TOTAL".to_string(),
            self.record_count().to_string(),
            self.total_usage.total_tokens.to_string(),
            self.total_usage.prompt_tokens.to_string(),
            self.total_usage.completion_tokens.to_string(),
            self.total_requests.to_string(),
            format!("{:.6}", self.total_cost_usd),
            format_secs(self.total_duration),
            format!(
                "{} ok / {} retried / {} failed",
                self.successes, self.retries, self.failures
            ),
        ]);

        let mut widths = headers.map(str::len);
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = (*width).max(cell.len());
            }
        }

        let mut out = String::new();
        push_row(&mut out, headers.iter().copied(), &widths);
        let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        push_row(&mut out, separator.iter().map(String::as_str), &widths);
        for row in &rows {
            push_row(&mut out, row.iter().map(String::as_str), &widths);
        }
        out
    }
}

fn push_row<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}

fn format_secs(duration: Duration) -> String {
    format!("{:.3}s", duration.as_secs_f64())
}

fn status_label(status: AttemptStatus) -> &'static str {
    match status {
        AttemptStatus::Success => "success",
        AttemptStatus::Failed => "failed",
        AttemptStatus::Retried => "retried",
    }
}
