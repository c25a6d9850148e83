//! Graph configuration loaded from YAML

use crate::error::PipelineError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Environment variables consulted when `llm.api_key` is not set
pub const API_KEY_ENV_VARS: &[&str] = &["SCRAPEGRAPH_API_KEY", "OPENAI_API_KEY"];

/// Largest context window `llm.model_tokens` may declare
pub const MAX_MODEL_TOKENS: usize = 10_000_000;

/// Top-level configuration for a scraper graph
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphConfig {
    /// Language-model backend
    #[serde(default)]
    pub llm: LlmConfig,

    /// OCR backend used by image graphs
    #[serde(default)]
    pub ocr: OcrConfig,

    /// Engine limits and retry policy
    #[serde(default)]
    pub engine: EngineConfig,

    /// Log prompts and model responses at debug level
    #[serde(default)]
    pub verbose: bool,
}

/// Model providers with an OpenAI-compatible chat completions API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    OneApi,
    Ollama,
    DeepSeek,
}

impl Provider {
    /// Parse a provider prefix such as `oneapi` in `oneapi/qwen-turbo`
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix.to_ascii_lowercase().as_str() {
            "openai" => Some(Provider::OpenAi),
            "oneapi" => Some(Provider::OneApi),
            "ollama" => Some(Provider::Ollama),
            "deepseek" => Some(Provider::DeepSeek),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::OneApi => "oneapi",
            Provider::Ollama => "ollama",
            Provider::DeepSeek => "deepseek",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::OneApi => "http://127.0.0.1:3000/v1",
            Provider::Ollama => "http://localhost:11434/v1",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
        }
    }

    /// Hosted providers reject unauthenticated requests
    pub fn requires_api_key(&self) -> bool {
        matches!(self, Provider::OpenAi | Provider::DeepSeek)
    }

    /// Context window assumed when `model_tokens` is not configured
    pub fn default_model_tokens(&self, model: &str) -> usize {
        match self {
            Provider::OpenAi if model.starts_with("gpt-3.5") => 16_385,
            Provider::OpenAi => 128_000,
            Provider::OneApi if model.starts_with("qwen") => 6_000,
            Provider::OneApi => 8_192,
            Provider::Ollama => 8_192,
            Provider::DeepSeek => 64_000,
        }
    }
}

/// Language-model configuration
///
/// Keys outside the recognized set are kept in `extra` and forwarded to the
/// backend request body unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API key; never serialized back out
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    /// `<provider>/<model>` or a bare OpenAI model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Endpoint override (defaults per provider)
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub temperature: Option<f32>,

    /// Completion token limit per request
    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Context window used to size chunks
    #[serde(default)]
    pub model_tokens: Option<usize>,

    /// Per-request timeout
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Unrecognized keys passed through to the backend
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: None,
            temperature: None,
            max_tokens: None,
            model_tokens: None,
            timeout_secs: default_llm_timeout(),
            extra: BTreeMap::new(),
        }
    }
}

impl LlmConfig {
    /// Split `model` into provider and bare model name
    pub fn provider_and_model(&self) -> std::result::Result<(Provider, &str), PipelineError> {
        match self.model.split_once('/') {
            Some((prefix, name)) => Provider::from_prefix(prefix)
                .map(|provider| (provider, name))
                .ok_or_else(|| {
                    PipelineError::configuration(format!(
                        "unknown model provider '{}' in '{}' (expected one of: openai, oneapi, ollama, deepseek)",
                        prefix, self.model
                    ))
                }),
            None => Ok((Provider::OpenAi, self.model.as_str())),
        }
    }

    /// Bare model name, without the provider prefix
    pub fn model_name(&self) -> &str {
        self.model
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or(&self.model)
    }

    /// Configured base URL or the provider default
    pub fn endpoint(&self) -> std::result::Result<String, PipelineError> {
        let (provider, _) = self.provider_and_model()?;
        Ok(self
            .base_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url().to_string()))
    }

    /// Configured key, falling back to the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| {
            API_KEY_ENV_VARS
                .iter()
                .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        })
    }

    /// Context window for chunking
    pub fn context_window(&self) -> usize {
        self.model_tokens.unwrap_or_else(|| match self.provider_and_model() {
            Ok((provider, model)) => provider.default_model_tokens(model),
            Err(_) => 8_192,
        })
    }
}

/// OCR configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OcrConfig {
    /// Language codes to detect
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// Tesseract executable
    #[serde(default = "default_ocr_binary")]
    pub binary: String,

    #[serde(default = "default_ocr_timeout")]
    pub timeout_secs: u64,
}

fn default_languages() -> Vec<String> {
    vec!["en".to_string()]
}

fn default_ocr_binary() -> String {
    "tesseract".to_string()
}

fn default_ocr_timeout() -> u64 {
    120
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            binary: default_ocr_binary(),
            timeout_secs: default_ocr_timeout(),
        }
    }
}

/// Engine limits and retry policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum steps per run before aborting with a cycle error
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,

    /// Retries after a transient failure (attempts = retries + 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry; doubles per retry
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Backoff ceiling
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Run-level time budget, checked before each step
    #[serde(default)]
    pub run_timeout_secs: Option<u64>,
}

fn default_max_steps() -> usize {
    50
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    10_000
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            run_timeout_secs: None,
        }
    }
}

impl EngineConfig {
    /// Delay before retry number `retry` (1-based)
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        Duration::from_millis(self.backoff_ms.saturating_mul(factor).min(self.max_backoff_ms))
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_secs.map(Duration::from_secs)
    }
}

impl GraphConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: GraphConfig = serde_yaml::from_str(yaml).context("Invalid config YAML")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        if self.llm.model.trim().is_empty() {
            return Err(PipelineError::configuration("llm.model must not be empty"));
        }

        let (provider, model) = self.llm.provider_and_model()?;
        if model.is_empty() {
            return Err(PipelineError::configuration(format!(
                "llm.model '{}' has no model name after the provider",
                self.llm.model
            )));
        }

        if provider.requires_api_key() && self.llm.resolved_api_key().is_none() {
            return Err(PipelineError::configuration(format!(
                "provider '{}' requires llm.api_key (or one of {})",
                provider.as_str(),
                API_KEY_ENV_VARS.join(", ")
            )));
        }

        if let Some(temperature) = self.llm.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(PipelineError::configuration(format!(
                    "llm.temperature must be between 0 and 2, got {}",
                    temperature
                )));
            }
        }

        if let Some(tokens) = self.llm.model_tokens {
            if tokens == 0 || tokens > MAX_MODEL_TOKENS {
                return Err(PipelineError::configuration(format!(
                    "llm.model_tokens must be between 1 and {}, got {}",
                    MAX_MODEL_TOKENS, tokens
                )));
            }
        }

        if self.engine.max_steps == 0 {
            return Err(PipelineError::configuration("engine.max_steps must be positive"));
        }

        if self.engine.backoff_ms > self.engine.max_backoff_ms {
            return Err(PipelineError::configuration(
                "engine.backoff_ms must not exceed engine.max_backoff_ms",
            ));
        }

        if self.ocr.languages.is_empty() {
            return Err(PipelineError::configuration("ocr.languages must not be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_oneapi_config() {
        let yaml = r#"
llm:
  api_key: "sk-test"
  model: "oneapi/qwen-turbo"
  base_url: "http://127.0.0.1:3000/v1"
"#;

        let config = GraphConfig::from_yaml(yaml).unwrap();
        let (provider, model) = config.llm.provider_and_model().unwrap();
        assert_eq!(provider, Provider::OneApi);
        assert_eq!(model, "qwen-turbo");
        assert_eq!(config.llm.endpoint().unwrap(), "http://127.0.0.1:3000/v1");
        assert_eq!(config.engine, EngineConfig::default());
        assert_eq!(config.ocr.languages, vec!["en"]);
    }

    #[test]
    fn test_unrecognized_llm_keys_pass_through() {
        let yaml = r#"
llm:
  model: "ollama/llama3"
  format: "json"
  top_p: 0.9
"#;

        let config = GraphConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.llm.extra.get("format"), Some(&Value::from("json")));
        assert!(config.llm.extra.contains_key("top_p"));
        assert!(!config.llm.extra.contains_key("model"));
    }

    #[test]
    fn test_unknown_provider_fails() {
        let yaml = r#"
llm:
  model: "acme/rocket-1"
"#;
        let err = GraphConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("unknown model provider"));
    }

    #[test]
    fn test_unknown_engine_key_fails() {
        let yaml = r#"
llm:
  model: "ollama/llama3"
engine:
  max_stepz: 3
"#;
        assert!(GraphConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_invalid_temperature_fails() {
        let yaml = r#"
llm:
  model: "ollama/llama3"
  temperature: 3.5
"#;
        let err = GraphConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_model_tokens_out_of_range_fails() {
        let yaml = r#"
llm:
  model: "ollama/llama3"
  model_tokens: 18446744073709551615
"#;
        let err = GraphConfig::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("model_tokens"));

        let yaml = r#"
llm:
  model: "ollama/llama3"
  model_tokens: 0
"#;
        assert!(GraphConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let mut config = GraphConfig::default();
        config.llm.api_key = Some("sk-secret".to_string());

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }

    #[test]
    fn test_bare_model_defaults_to_openai() {
        let llm = LlmConfig {
            model: "gpt-4o".to_string(),
            ..LlmConfig::default()
        };
        assert_eq!(llm.provider_and_model().unwrap(), (Provider::OpenAi, "gpt-4o"));
        assert_eq!(llm.model_name(), "gpt-4o");
        assert_eq!(llm.context_window(), 128_000);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let engine = EngineConfig {
            backoff_ms: 500,
            max_backoff_ms: 1_500,
            ..EngineConfig::default()
        };
        assert_eq!(engine.backoff_for(1), Duration::from_millis(500));
        assert_eq!(engine.backoff_for(2), Duration::from_millis(1_000));
        assert_eq!(engine.backoff_for(3), Duration::from_millis(1_500));
        assert_eq!(engine.backoff_for(30), Duration::from_millis(1_500));
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "llm:\n  model: \"ollama/mistral\"\nengine:\n  max_steps: 10\n").unwrap();

        let config = GraphConfig::from_file(&path).unwrap();
        assert_eq!(config.engine.max_steps, 10);
        assert_eq!(config.llm.model_name(), "mistral");
    }
}
