//! Edges between steps and the conditions that select them

use crate::core::state::{is_empty_value, State};
use regex::Regex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Pattern for matching a state value rendered as text
#[derive(Debug, Clone)]
pub enum ConditionPattern {
    /// Simple string contains match
    Simple(String),
    /// Regular expression match
    Regex(Regex),
}

impl ConditionPattern {
    /// Check if the pattern matches the given text
    pub fn matches(&self, text: &str) -> bool {
        match self {
            ConditionPattern::Simple(pattern) => text.contains(pattern),
            ConditionPattern::Regex(regex) => regex.is_match(text),
        }
    }
}

impl fmt::Display for ConditionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionPattern::Simple(s) => write!(f, "{}", s),
            ConditionPattern::Regex(r) => write!(f, "[regex: {}]", r.as_str()),
        }
    }
}

type Predicate = Arc<dyn Fn(&State) -> bool + Send + Sync>;

/// Predicate over the state used by conditional edges
#[derive(Clone)]
pub enum Condition {
    /// Key is absent or holds an empty value
    Empty(String),
    /// Key holds a non-empty value
    NonEmpty(String),
    /// Key holds a value whose text matches the pattern
    Matches {
        key: String,
        pattern: ConditionPattern,
    },
    /// Arbitrary predicate
    Custom(Predicate),
}

impl Condition {
    pub fn empty(key: impl Into<String>) -> Self {
        Condition::Empty(key.into())
    }

    pub fn non_empty(key: impl Into<String>) -> Self {
        Condition::NonEmpty(key.into())
    }

    pub fn matches(key: impl Into<String>, pattern: ConditionPattern) -> Self {
        Condition::Matches {
            key: key.into(),
            pattern,
        }
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&State) -> bool + Send + Sync + 'static,
    {
        Condition::Custom(Arc::new(predicate))
    }

    pub fn evaluate(&self, state: &State) -> bool {
        match self {
            Condition::Empty(key) => state.get(key).map_or(true, is_empty_value),
            Condition::NonEmpty(key) => state.get(key).is_some_and(|v| !is_empty_value(v)),
            Condition::Matches { key, pattern } => state.get(key).is_some_and(|value| match value {
                Value::String(s) => pattern.matches(s),
                other => pattern.matches(&other.to_string()),
            }),
            Condition::Custom(predicate) => predicate(state),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Empty(key) => write!(f, "Empty({})", key),
            Condition::NonEmpty(key) => write!(f, "NonEmpty({})", key),
            Condition::Matches { key, pattern } => write!(f, "Matches({} ~ {})", key, pattern),
            Condition::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// One arm of a conditional edge
#[derive(Debug, Clone)]
pub struct Branch {
    pub target: String,
    pub condition: Condition,
}

impl Branch {
    pub fn new(target: impl Into<String>, condition: Condition) -> Self {
        Self {
            target: target.into(),
            condition,
        }
    }
}

/// Outgoing edge of a step
#[derive(Debug, Clone)]
pub enum Edge {
    /// Always continue to the same step
    Unconditional(String),
    /// First branch whose condition holds, else `otherwise`
    Conditional {
        branches: Vec<Branch>,
        otherwise: Option<String>,
    },
}

impl Edge {
    /// Every step this edge may lead to
    pub fn targets(&self) -> Vec<&str> {
        match self {
            Edge::Unconditional(to) => vec![to.as_str()],
            Edge::Conditional {
                branches,
                otherwise,
            } => branches
                .iter()
                .map(|b| b.target.as_str())
                .chain(otherwise.as_deref())
                .collect(),
        }
    }

    /// Pick the target for `state`; `None` means no branch matched
    pub fn select(&self, state: &State) -> Option<&str> {
        match self {
            Edge::Unconditional(to) => Some(to),
            Edge::Conditional {
                branches,
                otherwise,
            } => branches
                .iter()
                .find(|b| b.condition.evaluate(state))
                .map(|b| b.target.as_str())
                .or(otherwise.as_deref()),
        }
    }
}
