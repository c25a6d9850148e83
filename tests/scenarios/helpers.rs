//! Test utility functions for scraper graph scenarios

use async_trait::async_trait;
use scrapegraph::{
    BackendError, Backends, EngineConfig, Generation, GenerationRequest, GraphConfig, Image,
    TextDetector, TextGenerator, TokenUsage,
};
use scrapegraph::{ExecutionSummary, Table};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One scripted model reply
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    RateLimited,
    Status(u16),
}

impl Reply {
    pub fn text(content: &str) -> Self {
        Reply::Text(content.to_string())
    }
}

/// Mock generator that returns predefined replies in order
pub struct MockGenerator {
    replies: Vec<Reply>,
    /// `(needle, reply)` pairs chosen by prompt content, ahead of `replies`
    by_prompt: Vec<(String, String)>,
    index: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            by_prompt: Vec::new(),
            index: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Reply with the first entry whose needle occurs in the prompt
    pub fn by_prompt(routes: &[(&str, &str)]) -> Self {
        let mut generator = Self::new(Vec::new());
        generator.by_prompt = routes
            .iter()
            .map(|(needle, reply)| (needle.to_string(), reply.to_string()))
            .collect();
        generator
    }

    /// Same JSON reply for every request
    pub fn always(content: &str) -> Self {
        Self::new(vec![Reply::text(content); 16])
    }

    /// Number of requests received
    pub fn calls(&self) -> usize {
        self.index.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, BackendError> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        let idx = self.index.fetch_add(1, Ordering::SeqCst);
        // Let concurrent runs interleave
        tokio::task::yield_now().await;

        if let Some((_, reply)) = self
            .by_prompt
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle.as_str()))
        {
            return Ok(Generation::new(reply.clone(), "llama3").with_usage(TokenUsage::new(100, 20)));
        }

        match self.replies.get(idx) {
            Some(Reply::Text(content)) => {
                Ok(Generation::new(content.clone(), "llama3").with_usage(TokenUsage::new(100, 20)))
            }
            Some(Reply::RateLimited) => Err(BackendError::RateLimited {
                provider: "ollama".to_string(),
                retry_after_secs: None,
            }),
            Some(Reply::Status(status)) => Err(BackendError::Api {
                status: *status,
                message: "scripted failure".to_string(),
            }),
            None => Err(BackendError::Internal(format!(
                "MockGenerator: No reply available for request {}",
                idx + 1
            ))),
        }
    }

    fn model(&self) -> &str {
        "llama3"
    }
}

/// Mock OCR backend
pub enum MockDetector {
    Text(String),
    Missing,
}

pub struct CountingDetector {
    behavior: MockDetector,
    calls: AtomicUsize,
}

impl CountingDetector {
    pub fn text(text: &str) -> Self {
        Self {
            behavior: MockDetector::Text(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            behavior: MockDetector::Missing,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextDetector for CountingDetector {
    async fn detect(&self, _image: &Image, _languages: &[String]) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MockDetector::Text(text) => Ok(text.clone()),
            MockDetector::Missing => Err(BackendError::DependencyMissing {
                capability: "OCR text detection".to_string(),
                hint: "Install tesseract".to_string(),
            }),
        }
    }
}

/// Local model config with near-zero backoff
pub fn test_config() -> GraphConfig {
    let mut config = GraphConfig::default();
    config.llm.model = "ollama/llama3".to_string();
    config.engine = EngineConfig {
        backoff_ms: 1,
        max_backoff_ms: 2,
        ..EngineConfig::default()
    };
    config
}

pub fn backends(generator: Arc<MockGenerator>, detector: Arc<CountingDetector>) -> Backends {
    Backends::new(generator, detector)
}

/// Two rows with a `name` column
pub fn people_table() -> Table {
    Table::from_csv("name\nJohn Doe\nJane Smith\n").unwrap()
}

pub const LAST_NAMES_PROMPT: &str = "List me all the last names";

pub const LAST_NAMES_REPLY: &str = r#"{"last_names": ["Doe", "Smith"]}"#;

/// Step names in order of first execution
pub fn step_order(summary: &ExecutionSummary) -> Vec<&str> {
    summary.steps.iter().map(|s| s.step_name.as_str()).collect()
}

/// Assert the summary holds exactly these success/retry/failure counts
pub fn assert_counts(summary: &ExecutionSummary, successes: usize, retries: usize, failures: usize) {
    assert_eq!(
        (summary.successes, summary.retries, summary.failures),
        (successes, retries, failures),
        "unexpected record counts:\n{}",
        summary.prettify()
    );
}
