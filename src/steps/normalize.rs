//! Splits the document into chunks that fit the model's context window

use crate::{
    core::{
        config::GraphConfig,
        state::State,
        step::{StepHandler, StepOutput},
    },
    error::StepError,
    steps::keys,
};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Rough characters-per-token ratio for sizing chunks
pub const CHARS_PER_TOKEN: usize = 4;

/// Tokens kept free for the prompt template and the answer
const RESERVED_TOKENS: usize = 1_000;

const MIN_CHUNK_TOKENS: usize = 256;

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeStep {
    chunk_chars: Option<usize>,
}

impl NormalizeStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed chunk size, ignoring the configured context window
    pub fn with_chunk_chars(chunk_chars: usize) -> Self {
        Self {
            chunk_chars: Some(chunk_chars.max(1)),
        }
    }

    fn chunk_chars(&self, state: &State) -> Result<usize, StepError> {
        if let Some(chars) = self.chunk_chars {
            return Ok(chars);
        }
        let config: GraphConfig = match state.get(keys::CONFIG) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| StepError::fatal(format!("invalid config in state: {}", e)))?,
            None => GraphConfig::default(),
        };
        let tokens = config
            .llm
            .context_window()
            .saturating_sub(RESERVED_TOKENS)
            .max(MIN_CHUNK_TOKENS);
        Ok(tokens.saturating_mul(CHARS_PER_TOKEN))
    }
}

#[async_trait]
impl StepHandler for NormalizeStep {
    async fn execute(&self, state: &State) -> Result<StepOutput, StepError> {
        let document = state
            .get_str(keys::DOCUMENT)
            .ok_or_else(|| StepError::fatal("document is not text"))?;

        let chunk_chars = self.chunk_chars(state)?;
        let chunks = chunk_text(document, chunk_chars);
        debug!(
            "Split {} chars into {} chunks of at most {} chars",
            document.len(),
            chunks.len(),
            chunk_chars
        );

        Ok(StepOutput::single(
            keys::CHUNKS,
            Value::Array(chunks.into_iter().map(Value::String).collect()),
        ))
    }
}

/// Greedy split on blank lines, hard-splitting blocks longer than `max_chars`
///
/// Always returns at least one chunk, so an empty document yields `[""]`.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for block in text.split("\n\n").map(str::trim).filter(|b| !b.is_empty()) {
        let pieces = split_block(block, max_chars);
        for piece in pieces {
            let needed = if current.is_empty() {
                piece.chars().count()
            } else {
                current.chars().count() + 2 + piece.chars().count()
            };
            if needed > max_chars && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push_str("\n\n");
            }
            current.push_str(&piece);
        }
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn split_block(block: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = block.chars().collect();
    if chars.len() <= max_chars {
        return vec![block.to_string()];
    }
    chars
        .chunks(max_chars)
        .map(|piece| piece.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_small_document_is_one_chunk() {
        assert_eq!(chunk_text("a\n\nb", 100), vec!["a\n\nb"]);
        assert_eq!(chunk_text("", 100), vec![""]);
    }

    #[test]
    fn test_blocks_are_packed_greedily() {
        let chunks = chunk_text("aaaa\n\nbbbb\n\ncccc", 10);
        assert_eq!(chunks, vec!["aaaa\n\nbbbb", "cccc"]);
    }

    #[test]
    fn test_long_block_is_hard_split() {
        let chunks = chunk_text(&"x".repeat(25), 10);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_multibyte_split_is_safe() {
        let chunks = chunk_text(&"é".repeat(5), 2);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[tokio::test]
    async fn test_chunk_size_follows_model_tokens() {
        let config = json!({"llm": {"model": "ollama/llama3", "model_tokens": 1256}});
        let document = "row\n\n".repeat(400);
        let state = State::new()
            .with(keys::DOCUMENT, document)
            .with(keys::CONFIG, config);

        let output = NormalizeStep::new().execute(&state).await.unwrap();
        let chunks = output.values.get(keys::CHUNKS).and_then(Value::as_array).unwrap();

        // (1256 - 1000) tokens * 4 chars = 1024 chars per chunk
        assert_eq!(chunks.len(), 2);
        assert!(chunks
            .iter()
            .all(|c| c.as_str().map_or(0, |s| s.chars().count()) <= 1024));
    }

    #[tokio::test]
    async fn test_huge_context_window_does_not_overflow() {
        let config = json!({"llm": {"model": "ollama/llama3", "model_tokens": usize::MAX}});
        let state = State::new()
            .with(keys::DOCUMENT, "name: John Doe\n\nname: Jane Smith")
            .with(keys::CONFIG, config);

        let output = NormalizeStep::new().execute(&state).await.unwrap();
        let chunks = output.values.get(keys::CHUNKS).and_then(Value::as_array).unwrap();
        assert_eq!(chunks.len(), 1);
    }
}
