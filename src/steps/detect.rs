//! OCR step for image sources

use crate::{
    backend::{detect_text, TextDetector},
    core::{
        state::State,
        step::{StepHandler, StepOutput},
    },
    error::StepError,
    source::Source,
    steps::{keys, read_source},
};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Detects the text in an image source and emits it as a single chunk
#[derive(Clone)]
pub struct DetectTextStep {
    detector: Arc<dyn TextDetector>,
    languages: Vec<String>,
}

impl DetectTextStep {
    pub fn new(detector: Arc<dyn TextDetector>, languages: Vec<String>) -> Self {
        Self {
            detector,
            languages,
        }
    }
}

#[async_trait]
impl StepHandler for DetectTextStep {
    async fn execute(&self, state: &State) -> Result<StepOutput, StepError> {
        let image = match read_source(state)? {
            Source::Image(image) => image,
            other => {
                return Err(StepError::fatal(format!(
                    "detect_text needs an image source, got {}",
                    other.kind()
                )))
            }
        };

        let text =
            detect_text(self.detector.as_ref(), &image, Some(self.languages.as_slice())).await?;
        debug!("Detected {} chars of text in {}", text.len(), image.path().display());

        Ok(StepOutput::single(keys::CHUNKS, json!([Value::String(text)])))
    }
}
