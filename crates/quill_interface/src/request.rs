//! Request and response types for text generation.

use serde::{Deserialize, Serialize};

/// A single-prompt text generation request.
///
/// `model` is the provider-local model name, without any `provider:` prefix.
///
/// # Examples
///
/// ```
/// use quill_interface::GenerationRequestBuilder;
///
/// let request = GenerationRequestBuilder::default()
///     .model("gpt-4o-mini")
///     .prompt("Write a premise about a lighthouse.")
///     .max_output_tokens(Some(512))
///     .build()
///     .unwrap();
///
/// assert_eq!(request.model(), "gpt-4o-mini");
/// assert_eq!(*request.temperature(), None);
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[builder(setter(into))]
pub struct GenerationRequest {
    /// Model to run
    model: String,
    /// Prompt text
    prompt: String,
    /// Upper bound on response length
    #[builder(default)]
    max_output_tokens: Option<u32>,
    /// Sampling temperature
    #[builder(default)]
    temperature: Option<f32>,
}

/// Text returned by a provider, with billing details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Generated text, possibly empty
    pub text: String,
    /// Actual cost charged in USD
    pub cost: f64,
    /// Prompt tokens billed
    pub input_tokens: u32,
    /// Completion tokens billed
    pub output_tokens: u32,
}
