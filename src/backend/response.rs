//! Backend request/response types

use crate::telemetry::TokenUsage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for backend operations
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{provider} rate limit exceeded")]
    RateLimited {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Timeout after {0} seconds")]
    Timeout(u64),

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Optional library or binary not installed
    #[error("{capability} is not available. {hint}")]
    DependencyMissing { capability: String, hint: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Rate limits, timeouts, dropped connections and server-side errors
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::RateLimited { .. }
            | BackendError::Timeout(_)
            | BackendError::Network(_) => true,
            BackendError::Api { status, .. } => *status == 429 || *status >= 500,
            BackendError::DependencyMissing { .. }
            | BackendError::InvalidResponse(_)
            | BackendError::Internal(_) => false,
        }
    }
}

/// A single prompt sent to a text generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Optional system instruction
    pub system: Option<String>,

    /// The user prompt
    pub prompt: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// Response from a text generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generation {
    /// The response content
    pub content: String,

    /// Token usage information (if the backend reports it)
    pub usage: Option<TokenUsage>,

    /// Model that served the request
    pub model: String,
}

impl Generation {
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
            model: model.into(),
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(BackendError::Timeout(60).is_transient());
        assert!(BackendError::Network("connection reset".into()).is_transient());
        assert!(BackendError::RateLimited {
            provider: "openai".into(),
            retry_after_secs: Some(2),
        }
        .is_transient());
        assert!(BackendError::Api {
            status: 503,
            message: "overloaded".into(),
        }
        .is_transient());
        assert!(!BackendError::Api {
            status: 400,
            message: "bad request".into(),
        }
        .is_transient());
        assert!(!BackendError::InvalidResponse("no choices".into()).is_transient());
    }

    #[test]
    fn test_generation_builder() {
        let generation = Generation::new("{}", "qwen-turbo").with_usage(TokenUsage::new(10, 2));
        assert_eq!(generation.content, "{}");
        assert_eq!(generation.usage.map(|u| u.total_tokens), Some(12));
    }
}
