//! Concrete steps used by the scraper graphs

pub mod ask;
pub mod detect;
pub mod format;
pub mod load;
pub mod normalize;

pub use ask::{parse_json_answer, AskModelStep};
pub use detect::DetectTextStep;
pub use format::FormatStep;
pub use load::LoadStep;
pub use normalize::{chunk_text, NormalizeStep};

/// State keys shared by the graphs
pub mod keys {
    pub const PROMPT: &str = "prompt";
    pub const SOURCE: &str = "source";
    pub const CONFIG: &str = "config";
    pub const DOCUMENT: &str = "document";
    pub const CHUNKS: &str = "chunks";
    pub const ANSWER: &str = "answer";
    pub const RESULT: &str = "result";
}

use crate::{core::state::State, error::StepError, source::Source};

/// Deserialize the `source` key
pub(crate) fn read_source(state: &State) -> Result<Source, StepError> {
    let value = state
        .get(keys::SOURCE)
        .cloned()
        .ok_or_else(|| StepError::fatal("state has no source"))?;
    serde_json::from_value(value).map_err(|e| StepError::fatal(format!("invalid source: {}", e)))
}
