//! Turns a text or table source into a plain-text document

use crate::{
    core::{
        state::State,
        step::{StepHandler, StepOutput},
    },
    error::StepError,
    source::Source,
    steps::{keys, read_source},
};
use async_trait::async_trait;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default)]
pub struct LoadStep;

#[async_trait]
impl StepHandler for LoadStep {
    async fn execute(&self, state: &State) -> Result<StepOutput, StepError> {
        let document = match read_source(state)? {
            Source::Text { content } => content,
            Source::Table(table) if table.is_empty() => {
                warn!("Table source has no rows; the model sees an empty document");
                String::new()
            }
            Source::Table(table) => {
                debug!("Loaded table with {} rows", table.rows.len());
                table.to_text()
            }
            other => {
                return Err(StepError::fatal(format!(
                    "load cannot read a {} source",
                    other.kind()
                )))
            }
        };
        Ok(StepOutput::single(keys::DOCUMENT, document))
    }
}
