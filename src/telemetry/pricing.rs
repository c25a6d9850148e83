//! Per-model price table used for cost estimates

use crate::telemetry::record::TokenUsage;

/// USD price per 1K tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

const PRICES: &[(&str, ModelPricing)] = &[
    ("gpt-4o-mini", ModelPricing { prompt_per_1k: 0.000_15, completion_per_1k: 0.000_6 }),
    ("gpt-4o", ModelPricing { prompt_per_1k: 0.002_5, completion_per_1k: 0.01 }),
    ("gpt-4.1-mini", ModelPricing { prompt_per_1k: 0.000_4, completion_per_1k: 0.001_6 }),
    ("gpt-4.1", ModelPricing { prompt_per_1k: 0.002, completion_per_1k: 0.008 }),
    ("gpt-3.5-turbo", ModelPricing { prompt_per_1k: 0.000_5, completion_per_1k: 0.001_5 }),
    ("qwen-turbo", ModelPricing { prompt_per_1k: 0.000_3, completion_per_1k: 0.000_6 }),
    ("qwen-plus", ModelPricing { prompt_per_1k: 0.000_8, completion_per_1k: 0.002 }),
    ("deepseek-chat", ModelPricing { prompt_per_1k: 0.000_27, completion_per_1k: 0.001_1 }),
];

/// Look up the price of a model by its bare name (no provider prefix)
///
/// Longest prefix wins, so dated snapshots such as `gpt-4o-mini-2024-07-18`
/// resolve to their family.
pub fn pricing_for(model: &str) -> Option<ModelPricing> {
    PRICES
        .iter()
        .filter(|(name, _)| model.starts_with(name))
        .max_by_key(|(name, _)| name.len())
        .map(|(_, pricing)| *pricing)
}

/// Estimated cost in USD; unknown models and local backends cost zero
pub fn estimate_cost(model: &str, usage: &TokenUsage) -> f64 {
    pricing_for(model)
        .map(|p| {
            usage.prompt_tokens as f64 / 1000.0 * p.prompt_per_1k
                + usage.completion_tokens as f64 / 1000.0 * p.completion_per_1k
        })
        .unwrap_or(0.0)
}
