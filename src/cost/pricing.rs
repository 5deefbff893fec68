//! Pricing table
//!
//! Maps (provider, model) to per-million-token rates. Lookup tries an exact
//! model match first, then the longest configured key that is a prefix of the
//! requested model, which handles date-suffixed snapshots like
//! `claude-sonnet-4-20250514`. A miss is not an error; callers treat it as
//! zero cost so pricing gaps never block traffic.

use std::collections::HashMap;

/// Per-million-token price in USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

impl Rate {
    /// Cost in USD for the given token counts, linear at per-MTok rates.
    pub fn compute(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        input_tokens as f64 / 1_000_000.0 * self.input_per_mtok
            + output_tokens as f64 / 1_000_000.0 * self.output_per_mtok
    }
}

/// Lookup table: provider -> model -> rate.
pub struct PricingTable {
    rates: HashMap<String, HashMap<String, Rate>>,
}

impl PricingTable {
    /// Build a table from explicit entries.
    pub fn new(rates: HashMap<String, HashMap<String, Rate>>) -> Self {
        Self { rates }
    }

    /// Rate for a provider/model pair, exact match first, then the longest
    /// key that is a prefix of `model`.
    pub fn lookup(&self, provider: &str, model: &str) -> Option<Rate> {
        let models = self.rates.get(provider)?;
        if let Some(rate) = models.get(model) {
            return Some(*rate);
        }

        let mut best: Option<(&str, Rate)> = None;
        for (key, rate) in models {
            if model.starts_with(key.as_str()) {
                match best {
                    Some((best_key, _)) if key.len() <= best_key.len() => {}
                    _ => best = Some((key, *rate)),
                }
            }
        }
        best.map(|(_, rate)| rate)
    }
}

impl Default for PricingTable {
    /// Well-known model rates in USD per million tokens. Updated manually.
    fn default() -> Self {
        let mut rates: HashMap<String, HashMap<String, Rate>> = HashMap::new();

        rates.insert(
            "anthropic".to_string(),
            HashMap::from([
                (
                    "claude-sonnet-4".to_string(),
                    Rate { input_per_mtok: 3.0, output_per_mtok: 15.0 },
                ),
                (
                    "claude-sonnet-4-6".to_string(),
                    Rate { input_per_mtok: 3.0, output_per_mtok: 15.0 },
                ),
                (
                    "claude-haiku-3-5".to_string(),
                    Rate { input_per_mtok: 0.80, output_per_mtok: 4.0 },
                ),
                (
                    "claude-haiku-4-5".to_string(),
                    Rate { input_per_mtok: 0.80, output_per_mtok: 4.0 },
                ),
                (
                    "claude-opus-4".to_string(),
                    Rate { input_per_mtok: 15.0, output_per_mtok: 75.0 },
                ),
                (
                    "claude-opus-4-6".to_string(),
                    Rate { input_per_mtok: 15.0, output_per_mtok: 75.0 },
                ),
            ]),
        );

        rates.insert(
            "openai".to_string(),
            HashMap::from([
                (
                    "gpt-4o".to_string(),
                    Rate { input_per_mtok: 2.50, output_per_mtok: 10.0 },
                ),
                (
                    "gpt-4o-mini".to_string(),
                    Rate { input_per_mtok: 0.15, output_per_mtok: 0.60 },
                ),
                (
                    "gpt-4.1".to_string(),
                    Rate { input_per_mtok: 2.0, output_per_mtok: 8.0 },
                ),
                (
                    "gpt-4.1-mini".to_string(),
                    Rate { input_per_mtok: 0.40, output_per_mtok: 1.60 },
                ),
                (
                    "gpt-4.1-nano".to_string(),
                    Rate { input_per_mtok: 0.10, output_per_mtok: 0.40 },
                ),
                (
                    "o3".to_string(),
                    Rate { input_per_mtok: 2.0, output_per_mtok: 8.0 },
                ),
                (
                    "o4-mini".to_string(),
                    Rate { input_per_mtok: 1.10, output_per_mtok: 4.40 },
                ),
            ]),
        );

        // OpenRouter passes through to upstream providers; rates match
        // origin pricing.
        rates.insert(
            "openrouter".to_string(),
            HashMap::from([
                (
                    "anthropic/claude-sonnet-4".to_string(),
                    Rate { input_per_mtok: 3.0, output_per_mtok: 15.0 },
                ),
                (
                    "anthropic/claude-haiku-3-5".to_string(),
                    Rate { input_per_mtok: 0.80, output_per_mtok: 4.0 },
                ),
                (
                    "google/gemini-2.5-pro".to_string(),
                    Rate { input_per_mtok: 1.25, output_per_mtok: 10.0 },
                ),
                (
                    "google/gemini-2.5-flash".to_string(),
                    Rate { input_per_mtok: 0.15, output_per_mtok: 0.60 },
                ),
            ]),
        );

        Self { rates }
    }
}
