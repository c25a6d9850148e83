//! CLI output formatting

use crate::{core::state::ExecutionStatus, execution::ExecutionEvent};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

/// Create a spinner shown while a run is in flight
pub fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    if let Ok(template) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")
    {
        spinner.set_style(template);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Format a run status for display
pub fn format_status(status: ExecutionStatus) -> String {
    match status {
        ExecutionStatus::Idle => style("IDLE").dim().to_string(),
        ExecutionStatus::InProgress => style("RUNNING").yellow().to_string(),
        ExecutionStatus::Completed => style("COMPLETED").green().to_string(),
        ExecutionStatus::Aborted => style("ABORTED").red().to_string(),
    }
}

/// Format an execution event for display
pub fn format_execution_event(event: &ExecutionEvent) -> String {
    match event {
        ExecutionEvent::RunStarted {
            run_id,
            pipeline_name,
        } => format!(
            "{} Starting {} ({})",
            ROCKET,
            style(pipeline_name).bold(),
            style(&run_id.to_string()[..8]).dim()
        ),
        ExecutionEvent::StepStarted { step, attempt } => {
            if *attempt > 1 {
                format!(
                    "{} {} (attempt {})",
                    SPINNER,
                    style(step).cyan(),
                    style(attempt).dim()
                )
            } else {
                format!("{} {}", SPINNER, style(step).cyan())
            }
        }
        ExecutionEvent::StepRetrying {
            step,
            attempt,
            max_retries,
            backoff,
            error,
        } => format!(
            "{} {} failed (retry {}/{} in {:?}): {}",
            WARN,
            style(step).yellow(),
            attempt,
            max_retries,
            backoff,
            style(error).dim()
        ),
        ExecutionEvent::StepSucceeded {
            step,
            attempts,
            duration,
        } => {
            let retries = if *attempts > 1 {
                format!(" after {} attempts", attempts)
            } else {
                String::new()
            };
            format!(
                "{} {}{} {}",
                CHECK,
                style(step).green(),
                retries,
                style(format!("{:.2}s", duration.as_secs_f64())).dim()
            )
        }
        ExecutionEvent::StepFailed { step, error } => {
            format!("{} {}: {}", CROSS, style(step).red(), style(error).dim())
        }
        ExecutionEvent::StepRouted { from, to } => format!(
            "{} {} → {}",
            INFO,
            style(from).dim(),
            style(to).cyan()
        ),
        ExecutionEvent::RunFinished { run_id, status } => format!(
            "{} Run ({}) {}",
            INFO,
            style(&run_id.to_string()[..8]).dim(),
            format_status(*status)
        ),
    }
}

/// Pretty-print a result value, truncated to `max_lines`
pub fn format_result(value: &Value, max_lines: usize) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format_output(&pretty, max_lines)
}

/// Format output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}
