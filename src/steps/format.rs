//! Shapes the model answer into the run result

use crate::{
    core::{
        state::State,
        step::{StepHandler, StepOutput},
    },
    error::StepError,
    steps::keys,
};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Copies `answer` to `result`, wrapping non-objects as `{"content": ..}`
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatStep;

#[async_trait]
impl StepHandler for FormatStep {
    async fn execute(&self, state: &State) -> Result<StepOutput, StepError> {
        let answer = state
            .get(keys::ANSWER)
            .cloned()
            .ok_or_else(|| StepError::fatal("state has no answer"))?;

        let result = match answer {
            Value::Object(_) => answer,
            other => json!({ "content": other }),
        };
        Ok(StepOutput::single(keys::RESULT, result))
    }
}
