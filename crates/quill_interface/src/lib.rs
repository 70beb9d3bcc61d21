//! Trait definitions for model providers.
//!
//! A [`ModelProvider`] is one backend (an HTTP API, a local server, a test
//! double) that can price and serve a [`GenerationRequest`]. The model manager
//! picks a provider per call from the model identifier.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod provider;
mod request;
mod usage;

pub use provider::ModelProvider;
pub use request::{GenerationRequest, GenerationRequestBuilder, ProviderResponse};
pub use usage::{ModelPricing, TokenUsage, estimate_tokens};
