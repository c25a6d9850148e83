//! Picks the next step after one finishes

use crate::{
    core::{pipeline::Pipeline, state::State},
    error::{PipelineError, Result},
};
use tracing::debug;

/// Resolves outgoing edges against the current state
#[derive(Debug, Clone, Copy)]
pub struct EdgeResolver<'p> {
    pipeline: &'p Pipeline,
}

impl<'p> EdgeResolver<'p> {
    pub fn new(pipeline: &'p Pipeline) -> Self {
        Self { pipeline }
    }

    /// Next step after `from`, or `None` when `from` is terminal
    ///
    /// A conditional edge with no matching branch and no fallback is a
    /// configuration bug and fails with `UnroutableState`.
    pub fn next_step(&self, from: &str, state: &State) -> Result<Option<&'p str>> {
        let Some(edge) = self.pipeline.edge(from) else {
            return Ok(None);
        };

        match edge.select(state) {
            Some(next) => {
                debug!("Routing {} -> {}", from, next);
                Ok(Some(next))
            }
            None => Err(PipelineError::UnroutableState {
                step: from.to_string(),
            }),
        }
    }
}
