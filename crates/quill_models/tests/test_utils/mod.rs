//! Test utilities for model manager tests.
//!
//! This module provides a scripted mock provider.

use async_trait::async_trait;
use quill_error::{ProviderError, ProviderErrorKind};
use quill_interface::{GenerationRequest, ModelProvider, ProviderResponse};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A single scripted reply.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum MockResponse {
    /// Return this text
    Text(String),
    /// Fail with this error
    Error(ProviderErrorKind),
    /// Never answer within any sane timeout
    Hang,
}

/// Mock provider that replays a script, then repeats its fallback forever.
pub struct MockProvider {
    name: String,
    script: Mutex<Vec<MockResponse>>,
    fallback: MockResponse,
    cost_per_call: f64,
    estimate: f64,
    prompts: Arc<Mutex<Vec<String>>>,
}

#[allow(dead_code)]
impl MockProvider {
    /// Create a mock that always answers with `text`.
    pub fn new_success(text: impl Into<String>) -> Self {
        Self::new_sequence(Vec::new(), MockResponse::Text(text.into()))
    }

    /// Create a mock that replays `script`, then answers with `fallback`.
    pub fn new_sequence(script: Vec<MockResponse>, fallback: MockResponse) -> Self {
        Self {
            name: "mock".to_string(),
            script: Mutex::new(script),
            fallback,
            cost_per_call: 0.0,
            estimate: 0.0,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Charge `cost` per answered call.
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost_per_call = cost;
        self
    }

    /// Report `estimate` as the pre-flight cost.
    pub fn with_estimate(mut self, estimate: f64) -> Self {
        self.estimate = estimate;
        self
    }

    /// Number of times generate() was called.
    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn next_response(&self) -> MockResponse {
        let mut script = self.script.lock().unwrap();
        if script.is_empty() {
            self.fallback.clone()
        } else {
            script.remove(0)
        }
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn handles(&self, model: &str) -> bool {
        model.starts_with("mock-")
    }

    fn estimate_cost(&self, _request: &GenerationRequest) -> f64 {
        self.estimate
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<ProviderResponse, ProviderError> {
        self.prompts.lock().unwrap().push(request.prompt().clone());
        match self.next_response() {
            MockResponse::Text(text) => Ok(ProviderResponse {
                text,
                cost: self.cost_per_call,
                input_tokens: 10,
                output_tokens: 20,
            }),
            MockResponse::Error(kind) => Err(ProviderError::new(kind)),
            MockResponse::Hang => {
                tokio::time::sleep(Duration::from_secs(24 * 60 * 60)).await;
                Err(ProviderError::new(ProviderErrorKind::Network(
                    "hung call finished".to_string(),
                )))
            }
        }
    }
}
