//! Token usage and pricing.

use serde::{Deserialize, Serialize};

/// Rough characters-per-token ratio for English prose.
const CHARS_PER_TOKEN: usize = 4;

/// Estimate the token count of `text` without a tokenizer.
///
/// # Examples
///
/// ```
/// use quill_interface::estimate_tokens;
///
/// assert_eq!(estimate_tokens(""), 0);
/// assert_eq!(estimate_tokens("abcd"), 1);
/// assert_eq!(estimate_tokens("abcde"), 2);
/// ```
pub fn estimate_tokens(text: &str) -> u32 {
    text.chars().count().div_ceil(CHARS_PER_TOKEN) as u32
}

/// Token usage statistics for a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, derive_getters::Getters)]
pub struct TokenUsage {
    /// Tokens in the prompt.
    input_tokens: u32,
    /// Tokens in the response.
    output_tokens: u32,
}

impl TokenUsage {
    /// Create a new token usage record.
    pub fn new(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Total tokens in both directions.
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// Per-model price list in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Cost per million prompt tokens
    #[serde(default)]
    pub input_per_million: f64,
    /// Cost per million completion tokens
    #[serde(default)]
    pub output_per_million: f64,
}

impl ModelPricing {
    /// Calculate cost in USD for the given usage.
    ///
    /// # Examples
    ///
    /// ```
    /// use quill_interface::{ModelPricing, TokenUsage};
    ///
    /// let pricing = ModelPricing { input_per_million: 1.0, output_per_million: 4.0 };
    /// let cost = pricing.cost(&TokenUsage::new(500_000, 250_000));
    /// assert!((cost - 1.5).abs() < 1e-9);
    /// ```
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        let input = (*usage.input_tokens() as f64 / 1_000_000.0) * self.input_per_million;
        let output = (*usage.output_tokens() as f64 / 1_000_000.0) * self.output_per_million;
        input + output
    }
}
