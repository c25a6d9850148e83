//! OpenAI-compatible chat completions client
//!
//! Covers every provider the config knows: OpenAI, OneAPI gateways, Ollama
//! and DeepSeek all speak the same `/chat/completions` dialect.

use crate::backend::{
    client::ClientConfig,
    response::{BackendError, Generation, GenerationRequest},
    TextGenerator,
};
use crate::telemetry::TokenUsage;
use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize, Debug)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

/// Client for OpenAI-compatible endpoints
///
/// Holds one pooled `reqwest::Client`, reused for every request.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    http: Client,
    config: ClientConfig,
}

impl OpenAiCompatibleClient {
    pub fn new(config: ClientConfig) -> Result<Self, BackendError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    fn request_body(&self, request: &GenerationRequest) -> Value {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": request.prompt}));

        let mut body = Map::new();
        body.insert("model".to_string(), Value::from(self.config.model.clone()));
        body.insert("messages".to_string(), Value::Array(messages));
        if let Some(temperature) = self.config.temperature {
            body.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(max_tokens) = self.config.max_tokens {
            body.insert("max_tokens".to_string(), json!(max_tokens));
        }
        for (key, value) in &self.config.extra {
            body.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(body)
    }

    fn classify_send_error(&self, err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout(self.config.timeout_secs)
        } else if err.is_connect() || err.is_request() {
            BackendError::Network(err.to_string())
        } else {
            BackendError::Internal(err.to_string())
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiCompatibleClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, BackendError> {
        let url = self.config.completions_url();
        debug!(
            provider = %self.config.provider,
            model = %self.config.model,
            prompt_len = request.prompt.len(),
            "Sending chat completion request"
        );

        let mut req = self.http.post(&url).json(&self.request_body(request));
        if let Some(api_key) = &self.config.api_key {
            req = req.bearer_auth(api_key);
        }

        let response = req.send().await.map_err(|e| self.classify_send_error(e))?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            warn!(provider = %self.config.provider, "Rate limited by model endpoint");
            return Err(BackendError::RateLimited {
                provider: self.config.provider.clone(),
                retry_after_secs,
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Model endpoint returned an error");
            return Err(BackendError::Api {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse("response has no choices".to_string()))?
            .message
            .content
            .unwrap_or_default();

        debug!("Model returned {} bytes of content", content.len());

        Ok(Generation {
            content,
            usage: parsed
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
            model: parsed.model.unwrap_or_else(|| self.config.model.clone()),
        })
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
