//! Per-attempt model call telemetry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a single model call attempt ended.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CallOutcome {
    /// Non-empty text returned
    Success,
    /// Provider answered with empty or whitespace-only text
    EmptyResponse,
    /// Retryable provider failure
    Transient,
    /// Attempt exceeded its timeout
    Timeout,
    /// Non-retryable provider failure
    Permanent,
    /// Refused before issue because the budget could not cover it
    BudgetRefused,
}

/// One model call attempt, appended to the telemetry log.
///
/// # Examples
///
/// ```
/// use quill_core::{CallOutcome, ModelCallRecordBuilder};
///
/// let record = ModelCallRecordBuilder::default()
///     .provider("openai")
///     .model("gpt-4o-mini")
///     .attempt(1u32)
///     .outcome(CallOutcome::Success)
///     .cost(0.0012)
///     .build()
///     .unwrap();
///
/// assert_eq!(record.provider(), "openai");
/// assert_eq!(*record.outcome(), CallOutcome::Success);
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
#[builder(setter(into), build_fn(private, name = "build_internal"))]
pub struct ModelCallRecord {
    /// Provider that served (or refused) the attempt
    provider: String,
    /// Model identifier without the provider prefix
    model: String,
    /// One-based attempt number within the invocation
    attempt: u32,
    /// Wall time spent on the attempt, in milliseconds
    #[builder(default)]
    elapsed_ms: u64,
    /// Actual cost charged (USD), zero unless the provider billed the call
    #[builder(default)]
    cost: f64,
    /// How the attempt ended
    outcome: CallOutcome,
    /// Error message for failed attempts
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    /// When the attempt finished
    #[builder(default = "Utc::now()")]
    timestamp: DateTime<Utc>,
}

impl ModelCallRecordBuilder {
    /// Build the record.
    ///
    /// # Errors
    ///
    /// Returns error if provider, model, attempt or outcome is missing.
    pub fn build(&self) -> Result<ModelCallRecord, String> {
        self.build_internal().map_err(|e| e.to_string())
    }
}
