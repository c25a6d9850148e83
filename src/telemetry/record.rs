//! Per-attempt execution records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::time::Duration;

/// Token usage reported by a model call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Telemetry a step reports about its own work
///
/// Deterministic steps leave everything unset; the engine measures duration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepTelemetry {
    pub token_usage: Option<TokenUsage>,
    pub cost_estimate: Option<f64>,
    /// Model requests that returned a response
    pub successful_requests: u32,
}

impl StepTelemetry {
    /// Fold one model call into the totals
    pub fn add_call(&mut self, usage: Option<TokenUsage>, cost: f64) {
        if let Some(usage) = usage {
            *self.token_usage.get_or_insert_with(TokenUsage::default) += usage;
        }
        *self.cost_estimate.get_or_insert(0.0) += cost;
        self.successful_requests += 1;
    }
}

/// Outcome of one step attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptStatus {
    Success,
    Failed,
    /// Failed transiently and was attempted again
    Retried,
}

/// One step attempt, appended by the engine and never mutated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub step_name: String,
    /// 1-based attempt number within this visit of the step
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
    pub token_usage: Option<TokenUsage>,
    pub cost_estimate: Option<f64>,
    pub successful_requests: u32,
    pub status: AttemptStatus,
    pub error: Option<String>,
}

impl ExecutionRecord {
    /// Record a successful attempt along with the step's own telemetry
    pub fn success(
        step_name: &str,
        attempt: u32,
        started_at: DateTime<Utc>,
        duration: Duration,
        telemetry: &StepTelemetry,
    ) -> Self {
        Self {
            step_name: step_name.to_string(),
            attempt,
            started_at,
            duration,
            token_usage: telemetry.token_usage,
            cost_estimate: telemetry.cost_estimate,
            successful_requests: telemetry.successful_requests,
            status: AttemptStatus::Success,
            error: None,
        }
    }

    /// Record a failed attempt; `status` is `Retried` or `Failed`
    pub fn failure(
        step_name: &str,
        attempt: u32,
        started_at: DateTime<Utc>,
        duration: Duration,
        status: AttemptStatus,
        error: String,
    ) -> Self {
        Self {
            step_name: step_name.to_string(),
            attempt,
            started_at,
            duration,
            token_usage: None,
            cost_estimate: None,
            successful_requests: 0,
            status,
            error: Some(error),
        }
    }
}

pub(crate) mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
