//! Prompt templates for model-calling steps
//!
//! Placeholders are `{question}`, `{content}`, `{chunk_id}` and
//! `{chunk_count}`; [`render`] substitutes them.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const SYSTEM: &str = "You are a data extraction assistant. \
You answer questions about the supplied content and reply with a single JSON object only.";

pub const ANSWER: &str = "You are given the content of a document.
Answer the question using only that content.
Reply with a JSON object and nothing else. If the content does not contain
the answer, reply with {}.

QUESTION: {question}

CONTENT:
{content}
";

pub const ANSWER_CHUNK: &str = "You are given part {chunk_id} of {chunk_count} of a document.
Answer the question using only this part. Reply with a JSON object and
nothing else. If this part does not contain the answer, reply with {}.

QUESTION: {question}

CONTENT:
{content}
";

pub const MERGE: &str = "You are given partial JSON answers to the same question, one per
part of a document. Merge them into a single JSON object that answers the
question. Drop duplicates. Reply with the JSON object and nothing else.

QUESTION: {question}

PARTIAL ANSWERS:
{content}
";

pub const RETRY: &str = "A previous attempt to answer this question returned nothing.
Read the content again carefully. The answer may be spread across many
rows or phrased differently from the question. Extract every value that is
relevant, even partially. Reply with a non-empty JSON object and nothing
else.

QUESTION: {question}

CONTENT:
{content}
";

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\w+)\}").unwrap());

/// Substitute `{name}` placeholders in one pass; unknown placeholders are left as-is
///
/// Substituted values are never scanned again, so a question containing
/// `{content}` stays literal.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            vars.iter()
                .find(|(key, _)| *key == name)
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}
