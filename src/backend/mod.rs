//! Model and OCR backends behind capability traits

pub mod client;
pub mod ocr;
pub mod openai;
pub mod response;

use crate::core::config::GraphConfig;
use crate::error::PipelineError;
use async_trait::async_trait;
use std::sync::Arc;

pub use client::ClientConfig;
pub use ocr::{detect_text, Image, TesseractDetector};
pub use openai::OpenAiCompatibleClient;
pub use response::{BackendError, Generation, GenerationRequest};

/// Trait for text generation - allows for different implementations
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one prompt and wait for the full response
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, BackendError>;

    /// Bare model name, used for cost estimates
    fn model(&self) -> &str;
}

/// Trait for extracting text from images
#[async_trait]
pub trait TextDetector: Send + Sync {
    async fn detect(&self, image: &Image, languages: &[String]) -> Result<String, BackendError>;
}

/// Backend handles owned by one graph instance
///
/// Created when the graph is constructed and dropped with it.
#[derive(Clone)]
pub struct Backends {
    pub generator: Arc<dyn TextGenerator>,
    pub detector: Arc<dyn TextDetector>,
}

impl Backends {
    pub fn new(generator: Arc<dyn TextGenerator>, detector: Arc<dyn TextDetector>) -> Self {
        Self {
            generator,
            detector,
        }
    }

    /// Pick implementations from a validated configuration
    pub fn from_config(config: &GraphConfig) -> Result<Self, PipelineError> {
        let client_config = ClientConfig::from_llm(&config.llm)?;
        let generator = OpenAiCompatibleClient::new(client_config)
            .map_err(|e| PipelineError::configuration(e.to_string()))?;
        let detector = TesseractDetector::from_config(&config.ocr);
        Ok(Self::new(Arc::new(generator), Arc::new(detector)))
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_detector(mut self, detector: Arc<dyn TextDetector>) -> Self {
        self.detector = detector;
        self
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("model", &self.generator.model())
            .finish_non_exhaustive()
    }
}
