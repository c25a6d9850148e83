//! Shared run state and execution status models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Key/value mapping threaded through every step of one run
///
/// Keys keep their insertion order, so a serialized state reads in the order
/// the pipeline produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State {
    values: Map<String, Value>,
}

impl State {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a value as a string slice, if it is a JSON string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Keys from `required` that are not present
    pub fn missing_keys(&self, required: &BTreeSet<String>) -> Vec<String> {
        required
            .iter()
            .filter(|key| !self.values.contains_key(key.as_str()))
            .cloned()
            .collect()
    }

    /// Merge the `declared` keys of `produced` into this state
    ///
    /// Returns the keys that were present in `produced` but not declared;
    /// those are dropped.
    pub fn merge_declared(&mut self, produced: State, declared: &BTreeSet<String>) -> Vec<String> {
        let mut discarded = Vec::new();
        for (key, value) in produced.values {
            if declared.contains(&key) {
                self.values.insert(key, value);
            } else {
                discarded.push(key);
            }
        }
        discarded
    }

    /// Consume the state, returning the underlying map
    pub fn into_inner(self) -> Map<String, Value> {
        self.values
    }
}

impl From<Map<String, Value>> for State {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for State {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Whether a value counts as "no result"
///
/// Null, blank strings, and empty arrays or objects are empty.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Overall run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    /// Run has not started
    Idle,
    /// Steps are being executed
    InProgress,
    /// A terminal step finished
    Completed,
    /// A fatal error stopped the run
    Aborted,
}

/// State of the step the engine is currently looking at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepState {
    /// Selected, inputs not yet checked
    Pending { step: String },
    /// Handler invoked
    Running { step: String, attempt: u32 },
    /// Outputs merged into the state
    Succeeded { step: String, attempts: u32 },
    /// Aborted the run
    Failed { step: String, error: String },
}

impl StepState {
    pub fn step(&self) -> &str {
        match self {
            StepState::Pending { step }
            | StepState::Running { step, .. }
            | StepState::Succeeded { step, .. }
            | StepState::Failed { step, .. } => step,
        }
    }

    /// Check if step is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, StepState::Succeeded { .. } | StepState::Failed { .. })
    }
}

/// Lifecycle bookkeeping for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    /// Unique run ID
    pub run_id: Uuid,

    /// Current run status
    pub status: ExecutionStatus,

    /// When the run started
    pub started_at: Option<DateTime<Utc>>,

    /// When the run completed or aborted
    pub finished_at: Option<DateTime<Utc>>,

    /// Number of steps that finished successfully
    pub steps_executed: usize,

    /// The most recent step transition
    pub current: Option<StepState>,
}

impl RunState {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: ExecutionStatus::Idle,
            started_at: None,
            finished_at: None,
            steps_executed: 0,
            current: None,
        }
    }

    /// Mark run as started
    pub fn start(&mut self) {
        self.status = ExecutionStatus::InProgress;
        self.started_at = Some(Utc::now());
    }

    /// Record a step transition
    pub fn transition(&mut self, step_state: StepState) {
        if matches!(step_state, StepState::Succeeded { .. }) {
            self.steps_executed += 1;
        }
        self.current = Some(step_state);
    }

    /// Mark run as completed
    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// Mark run as aborted
    pub fn abort(&mut self) {
        self.status = ExecutionStatus::Aborted;
        self.finished_at = Some(Utc::now());
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}
