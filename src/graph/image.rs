//! Question answering over the text found in an image

use crate::{
    backend::Backends,
    core::{config::GraphConfig, pipeline::Pipeline, step::Step},
    error::{PipelineError, Result},
    graph::{answer_branches, base::GraphCore, ScraperGraph},
    source::Source,
    steps::{keys, AskModelStep, DetectTextStep, FormatStep},
};

/// `detect_text -> ask_model -> [retry_prompt] -> format`
#[derive(Debug)]
pub struct ImageScraperGraph {
    core: GraphCore,
}

impl ImageScraperGraph {
    pub fn new(
        prompt: impl Into<String>,
        source: impl Into<Source>,
        config: GraphConfig,
    ) -> Result<Self> {
        config.validate()?;
        let backends = Backends::from_config(&config)?;
        Self::with_backends(prompt, source, config, backends)
    }

    pub fn with_backends(
        prompt: impl Into<String>,
        source: impl Into<Source>,
        config: GraphConfig,
        backends: Backends,
    ) -> Result<Self> {
        let source = source.into();
        if !matches!(source, Source::Image(_)) {
            return Err(PipelineError::configuration(format!(
                "ImageScraperGraph needs an image source, got {}",
                source.kind()
            )));
        }
        config.validate()?;

        let pipeline = Self::pipeline(&config, &backends)?;
        Ok(Self {
            core: GraphCore::new(prompt, source, config, pipeline),
        })
    }

    fn pipeline(config: &GraphConfig, backends: &Backends) -> Result<Pipeline> {
        let ask = AskModelStep::new(backends.generator.clone()).verbose(config.verbose);
        let (branches, otherwise) = answer_branches();

        Pipeline::builder("image_scraper")
            .step(
                Step::new(
                    "detect_text",
                    DetectTextStep::new(backends.detector.clone(), config.ocr.languages.clone()),
                )
                .with_inputs([keys::SOURCE])
                .with_outputs([keys::CHUNKS]),
            )
            .step(
                Step::new("ask_model", ask.clone())
                    .with_inputs([keys::PROMPT, keys::CHUNKS])
                    .with_outputs([keys::ANSWER]),
            )
            .step(
                Step::new("retry_prompt", ask.strict())
                    .with_inputs([keys::PROMPT, keys::CHUNKS])
                    .with_outputs([keys::ANSWER]),
            )
            .step(
                Step::new("format", FormatStep)
                    .with_inputs([keys::ANSWER])
                    .with_outputs([keys::RESULT]),
            )
            .edge("detect_text", "ask_model")
            .conditional_edge("ask_model", branches, otherwise)
            .edge("retry_prompt", "format")
            .build()
    }
}

impl ScraperGraph for ImageScraperGraph {
    fn core(&self) -> &GraphCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut GraphCore {
        &mut self.core
    }
}
