//! Question answering over tabular sources

use crate::{
    backend::Backends,
    core::{config::GraphConfig, pipeline::Pipeline, step::Step},
    error::{PipelineError, Result},
    graph::{answer_branches, base::GraphCore, ScraperGraph},
    source::Source,
    steps::{keys, AskModelStep, FormatStep, LoadStep, NormalizeStep},
};

/// `load -> normalize -> ask_model -> [retry_prompt] -> format`
///
/// `retry_prompt` runs only when `ask_model` produced an empty answer.
#[derive(Debug)]
pub struct CsvScraperGraph {
    core: GraphCore,
}

impl CsvScraperGraph {
    /// Build the graph with backends chosen from `config`
    pub fn new(
        prompt: impl Into<String>,
        source: impl Into<Source>,
        config: GraphConfig,
    ) -> Result<Self> {
        config.validate()?;
        let backends = Backends::from_config(&config)?;
        Self::with_backends(prompt, source, config, backends)
    }

    /// Build the graph around caller-supplied backends
    pub fn with_backends(
        prompt: impl Into<String>,
        source: impl Into<Source>,
        config: GraphConfig,
        backends: Backends,
    ) -> Result<Self> {
        let source = source.into();
        if !matches!(source, Source::Table(_) | Source::Text { .. }) {
            return Err(PipelineError::configuration(format!(
                "CsvScraperGraph needs a table or text source, got {}",
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

        Pipeline::builder("csv_scraper")
            .step(
                Step::new("load", LoadStep)
                    .with_inputs([keys::SOURCE])
                    .with_outputs([keys::DOCUMENT]),
            )
            .step(
                Step::new("normalize", NormalizeStep::new())
                    .with_inputs([keys::DOCUMENT, keys::CONFIG])
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
            .edge("load", "normalize")
            .edge("normalize", "ask_model")
            .conditional_edge("ask_model", branches, otherwise)
            .edge("retry_prompt", "format")
            .build()
    }
}

impl ScraperGraph for CsvScraperGraph {
    fn core(&self) -> &GraphCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut GraphCore {
        &mut self.core
    }
}
