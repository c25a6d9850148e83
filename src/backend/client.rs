//! Model client configuration

use crate::core::config::LlmConfig;
use crate::error::PipelineError;
use serde_json::Value;
use std::collections::BTreeMap;

/// Configuration for an OpenAI-compatible model client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, without the `/chat/completions` suffix
    pub endpoint: String,

    /// Bearer token, if the endpoint needs one
    pub api_key: Option<String>,

    /// Bare model name sent in the request body
    pub model: String,

    /// Provider name used in errors and logs
    pub provider: String,

    pub temperature: Option<f32>,

    pub max_tokens: Option<u32>,

    /// Timeout for requests in seconds
    pub timeout_secs: u64,

    /// Extra request body fields forwarded verbatim
    pub extra: BTreeMap<String, Value>,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            model: model.into(),
            provider: "openai".to_string(),
            temperature: None,
            max_tokens: None,
            timeout_secs: 60,
            extra: BTreeMap::new(),
        }
    }

    /// Derive the client configuration from the `llm` config section
    pub fn from_llm(llm: &LlmConfig) -> Result<Self, PipelineError> {
        let (provider, model) = llm.provider_and_model()?;
        Ok(Self {
            endpoint: llm.endpoint()?,
            api_key: llm.resolved_api_key(),
            model: model.to_string(),
            provider: provider.as_str().to_string(),
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            timeout_secs: llm.timeout_secs,
            extra: llm.extra.clone(),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Full chat completions URL
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }
}
