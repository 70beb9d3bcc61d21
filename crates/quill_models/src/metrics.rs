//! Metrics for model calls.
//!
//! Provides OpenTelemetry-based metrics for tracking model call volume,
//! failures, latency, token usage and spend across all providers.

use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram, Meter},
};
use quill_core::CallOutcome;
use std::sync::OnceLock;

static METRICS: OnceLock<LlmMetrics> = OnceLock::new();

/// Metrics for model call attempts.
///
/// Labeled with provider and model name.
#[derive(Clone)]
pub struct LlmMetrics {
    /// Meter handle kept alive for metric instruments
    _meter: Meter,
    /// Successful attempts
    pub requests: Counter<u64>,
    /// Failed attempts
    pub errors: Counter<u64>,
    /// Attempt duration in seconds
    pub duration: Histogram<f64>,
    /// Prompt tokens billed
    pub prompt_tokens: Counter<u64>,
    /// Completion tokens billed
    pub completion_tokens: Counter<u64>,
    /// Spend in USD
    pub cost: Counter<f64>,
}

impl LlmMetrics {
    fn init() -> Self {
        let meter = global::meter("quill_models");

        Self {
            _meter: meter.clone(),
            requests: meter
                .u64_counter("llm.requests")
                .with_description("Successful model call attempts")
                .build(),
            errors: meter
                .u64_counter("llm.errors")
                .with_description("Failed model call attempts")
                .build(),
            duration: meter
                .f64_histogram("llm.duration")
                .with_unit("seconds")
                .with_description("Model call attempt duration")
                .build(),
            prompt_tokens: meter
                .u64_counter("llm.tokens.prompt")
                .with_description("Prompt tokens billed")
                .build(),
            completion_tokens: meter
                .u64_counter("llm.tokens.completion")
                .with_description("Completion tokens billed")
                .build(),
            cost: meter
                .f64_counter("llm.cost")
                .with_unit("USD")
                .with_description("Spend on model calls")
                .build(),
        }
    }

    /// Get the global metrics instance.
    pub fn get() -> &'static Self {
        METRICS.get_or_init(Self::init)
    }

    /// Record a completed attempt with its billing.
    pub fn record_request(
        &self,
        provider: &str,
        model: &str,
        duration_secs: f64,
        prompt_tokens: u32,
        completion_tokens: u32,
        cost: f64,
    ) {
        let labels = &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("model", model.to_string()),
        ];
        self.requests.add(1, labels);
        self.duration.record(duration_secs, labels);
        self.prompt_tokens.add(u64::from(prompt_tokens), labels);
        self.completion_tokens.add(u64::from(completion_tokens), labels);
        self.cost.add(cost, labels);
    }

    /// Record a failed attempt.
    pub fn record_error(&self, provider: &str, model: &str, outcome: CallOutcome) {
        let labels = &[
            KeyValue::new("provider", provider.to_string()),
            KeyValue::new("model", model.to_string()),
            KeyValue::new("error_type", outcome.to_string()),
        ];
        self.errors.add(1, labels);
    }
}

impl Default for LlmMetrics {
    fn default() -> Self {
        Self::get().clone()
    }
}
