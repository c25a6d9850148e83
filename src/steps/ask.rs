//! Asks the model to answer the prompt from the document content

use crate::{
    backend::{GenerationRequest, TextGenerator},
    core::{
        state::State,
        step::{StepHandler, StepOutput},
    },
    error::StepError,
    prompts,
    steps::keys,
    telemetry::{pricing::estimate_cost, StepTelemetry},
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Model-calling step behind both `ask_model` and `retry_prompt`
///
/// A single chunk is answered in one request. Several chunks are answered
/// one by one and the partial answers merged by a final request.
#[derive(Clone)]
pub struct AskModelStep {
    generator: Arc<dyn TextGenerator>,
    input_key: String,
    strict: bool,
    verbose: bool,
}

impl AskModelStep {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            input_key: keys::CHUNKS.to_string(),
            strict: false,
            verbose: false,
        }
    }

    /// Read content from `key` (a string or an array of strings)
    pub fn reading(mut self, key: impl Into<String>) -> Self {
        self.input_key = key.into();
        self
    }

    /// Use the stricter re-ask prompt; used after an empty answer
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    /// Log prompts and raw responses at debug level
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn input_key(&self) -> &str {
        &self.input_key
    }

    async fn ask(
        &self,
        prompt: String,
        telemetry: &mut StepTelemetry,
    ) -> Result<Value, StepError> {
        if self.verbose {
            debug!("Prompt:\n{}", prompt);
        }
        let request = GenerationRequest::new(prompt).with_system(prompts::SYSTEM);
        let generation = self.generator.generate(&request).await?;
        if self.verbose {
            debug!("Response:\n{}", generation.content);
        }

        let cost = generation
            .usage
            .map(|usage| estimate_cost(self.generator.model(), &usage))
            .unwrap_or(0.0);
        telemetry.add_call(generation.usage, cost);

        parse_json_answer(&generation.content)
    }

    fn chunks(&self, state: &State) -> Result<Vec<String>, StepError> {
        match state.get(&self.input_key) {
            Some(Value::String(text)) => Ok(vec![text.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        StepError::fatal(format!("{} must contain only strings", self.input_key))
                    })
                })
                .collect(),
            Some(_) => Err(StepError::fatal(format!(
                "{} must be a string or an array of strings",
                self.input_key
            ))),
            None => Err(StepError::fatal(format!("state has no {}", self.input_key))),
        }
    }
}

#[async_trait]
impl StepHandler for AskModelStep {
    async fn execute(&self, state: &State) -> Result<StepOutput, StepError> {
        let question = state
            .get_str(keys::PROMPT)
            .ok_or_else(|| StepError::fatal("prompt is not text"))?;
        let chunks = self.chunks(state)?;
        let mut telemetry = StepTelemetry::default();

        let answer = if self.strict || chunks.len() <= 1 {
            let template = if self.strict { prompts::RETRY } else { prompts::ANSWER };
            let content = chunks.join("\n\n");
            let prompt = prompts::render(
                template,
                &[("question", question), ("content", content.as_str())],
            );
            self.ask(prompt, &mut telemetry).await?
        } else {
            let count = chunks.len().to_string();
            let mut partials = Vec::with_capacity(chunks.len());
            for (index, chunk) in chunks.iter().enumerate() {
                let chunk_id = (index + 1).to_string();
                let prompt = prompts::render(
                    prompts::ANSWER_CHUNK,
                    &[
                        ("question", question),
                        ("chunk_id", chunk_id.as_str()),
                        ("chunk_count", count.as_str()),
                        ("content", chunk.as_str()),
                    ],
                );
                partials.push(self.ask(prompt, &mut telemetry).await?);
            }

            let merged_input = partials
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join("\n");
            let prompt = prompts::render(
                prompts::MERGE,
                &[("question", question), ("content", merged_input.as_str())],
            );
            self.ask(prompt, &mut telemetry).await?
        };

        Ok(StepOutput::single(keys::ANSWER, answer).with_telemetry(telemetry))
    }
}

/// Parse a model reply as JSON
///
/// Code fences and prose around the outermost object are tolerated; an
/// empty reply counts as `{}`.
pub fn parse_json_answer(content: &str) -> Result<Value, StepError> {
    let trimmed = strip_code_fence(content.trim());
    if trimmed.is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(StepError::fatal(format!(
        "model reply is not valid JSON: {}",
        truncate(trimmed, 200)
    )))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);

    // A tag line (```json) precedes the body unless the fence is on one line
    let body = match rest.split_once('\n') {
        Some((tag, body)) if !tag.trim_start().starts_with(|c: char| c == '{' || c == '[') => body,
        _ => {
            let inline = rest.trim_start();
            inline
                .strip_prefix("json")
                .or_else(|| inline.strip_prefix("JSON"))
                .unwrap_or(inline)
        }
    };
    body.trim()
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
