//! Model invocation with retry, timeout, cost accounting and telemetry.

use crate::{CostBudget, LlmMetrics, ProviderRegistry, SpendMeter};
use quill_config::QuillConfig;
use quill_core::{CallOutcome, ModelCallRecord, ModelCallRecordBuilder};
use quill_error::{
    JsonError, ProviderError, ProviderErrorKind, QuillError, QuillResult, RetryableError,
    ValidationError, ValidationErrorKind,
};
use quill_interface::{GenerationRequest, GenerationRequestBuilder, ModelProvider, ProviderResponse};
use std::io::Write;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tokio_retry2::{
    Retry, RetryError,
    strategy::{ExponentialFactorBackoff, jitter},
};
use tracing::{debug, info, instrument, warn};

/// Times an empty response is re-issued before it becomes an error.
const EMPTY_RESPONSE_REISSUES: u32 = 1;

/// Per-call settings.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeOptions {
    /// Limit on each attempt
    pub timeout: Duration,
    /// Retries after the first attempt for transient failures
    pub max_retries: u32,
    /// Response length limit passed to the provider
    pub max_output_tokens: Option<u32>,
    /// Cost to reserve instead of the provider's estimate
    pub estimated_cost: Option<f64>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(600),
            max_retries: 3,
            max_output_tokens: None,
            estimated_cost: None,
        }
    }
}

impl InvokeOptions {
    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry limit.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the expected cost.
    pub fn with_estimated_cost(mut self, cost: f64) -> Self {
        self.estimated_cost = Some(cost);
        self
    }
}

/// Successful model call.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct ModelResponse {
    /// Non-empty generated text
    text: String,
    /// Provider-local model name
    model: String,
    /// Provider that served the call
    provider: String,
    /// Attempts issued, including failures and empty responses
    attempts: u32,
    /// Total cost across all attempts in USD
    cost: f64,
    /// Wall time from first attempt to success
    elapsed: Duration,
}

impl ModelResponse {
    /// Attempts beyond the first.
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    /// Take the generated text.
    pub fn into_text(self) -> String {
        self.text
    }
}

/// Issues prompts to model providers.
///
/// Transient failures and timeouts are retried with exponential backoff;
/// permanent failures return immediately. Every attempt is appended to the
/// call log, and every attempt's estimated cost is reserved against the
/// shared [`CostBudget`] before it is issued.
#[derive(Debug, Clone)]
pub struct ModelManager {
    registry: ProviderRegistry,
    budget: CostBudget,
    default_model: String,
    defaults: InvokeOptions,
    backoff_base: Duration,
    backoff_max: Duration,
    records: Arc<Mutex<Vec<ModelCallRecord>>>,
}

impl ModelManager {
    /// Create a manager with default options and an unlimited budget.
    pub fn new(registry: ProviderRegistry, default_model: impl Into<String>) -> Self {
        Self {
            registry,
            budget: CostBudget::unlimited(),
            default_model: default_model.into(),
            defaults: InvokeOptions::default(),
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a manager from configuration, registering every configured provider.
    ///
    /// # Errors
    ///
    /// Returns error if the budget ceiling is invalid.
    pub fn from_config(config: &QuillConfig) -> QuillResult<Self> {
        let budget = match config.budget.ceiling {
            Some(ceiling) => CostBudget::with_ceiling(ceiling)?,
            None => CostBudget::unlimited(),
        };
        Ok(
            Self::new(ProviderRegistry::from_config(config), &config.models.default_model)
                .with_budget(budget)
                .with_defaults(InvokeOptions {
                    timeout: config.models.timeout(),
                    max_retries: config.models.max_retries,
                    max_output_tokens: None,
                    estimated_cost: None,
                })
                .with_backoff(config.models.backoff_base(), config.models.backoff_max()),
        )
    }

    /// Use `budget` for all calls.
    pub fn with_budget(mut self, budget: CostBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Replace the default options.
    pub fn with_defaults(mut self, defaults: InvokeOptions) -> Self {
        self.defaults = defaults;
        self
    }

    /// Set the first backoff delay and the delay cap.
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    /// Model used when the caller does not pick one.
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Options from configuration.
    pub fn default_options(&self) -> InvokeOptions {
        self.defaults.clone()
    }

    /// The shared budget.
    pub fn budget(&self) -> &CostBudget {
        &self.budget
    }

    /// The provider registry.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Snapshot of every attempt recorded so far.
    pub fn records(&self) -> Vec<ModelCallRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Total cost of every recorded attempt.
    pub fn total_cost(&self) -> f64 {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|r| *r.cost())
            .sum()
    }

    /// Write the call log as JSON lines, returning the number written.
    ///
    /// # Errors
    ///
    /// Returns error if serialization or the writer fails.
    pub fn export_records_jsonl<W: Write>(&self, mut writer: W) -> QuillResult<usize> {
        let records = self.records();
        for record in &records {
            serde_json::to_writer(&mut writer, record)
                .map_err(|e| JsonError::new("call record", e))?;
            writer
                .write_all(b"\n")
                .map_err(|e| JsonError::new("call record", e))?;
        }
        writer
            .flush()
            .map_err(|e| JsonError::new("call records", e))?;
        Ok(records.len())
    }

    /// Expected cost of sending `prompt` to `model_id`.
    ///
    /// # Errors
    ///
    /// Returns error if no provider serves the model.
    pub fn estimate_cost(
        &self,
        prompt: &str,
        model_id: &str,
        options: &InvokeOptions,
    ) -> QuillResult<f64> {
        if let Some(cost) = options.estimated_cost {
            return Ok(cost);
        }
        let (provider, model) = self.registry.resolve(model_id)?;
        let request = build_request(&model, prompt, options)?;
        Ok(provider.estimate_cost(&request))
    }

    /// Send `prompt` to `model_id` and return non-empty text.
    ///
    /// An empty or whitespace-only response is re-issued once with the same
    /// prompt before failing validation.
    ///
    /// # Errors
    ///
    /// - `InvalidModel` if no provider serves the model
    /// - `BudgetExceeded` if an attempt's estimate does not fit the budget
    /// - the last provider error once retries are exhausted, or the first
    ///   permanent one
    /// - `EmptyResponse` if every re-issue comes back empty
    pub async fn invoke(
        &self,
        prompt: &str,
        model_id: &str,
        options: &InvokeOptions,
    ) -> QuillResult<ModelResponse> {
        self.invoke_metered(prompt, model_id, options, &SpendMeter::new())
            .await
    }

    /// Like [`ModelManager::invoke`], also adding every billed attempt to
    /// `meter`.
    ///
    /// The meter is updated even when the invocation fails, so it reflects
    /// spend on empty responses that exhausted their re-issues.
    ///
    /// # Errors
    ///
    /// Same as [`ModelManager::invoke`].
    #[instrument(skip(self, prompt, options, meter), fields(prompt_len = prompt.len(), timeout_ms = options.timeout.as_millis() as u64, max_retries = options.max_retries))]
    pub async fn invoke_metered(
        &self,
        prompt: &str,
        model_id: &str,
        options: &InvokeOptions,
        meter: &SpendMeter,
    ) -> QuillResult<ModelResponse> {
        let (provider, model) = self.registry.resolve(model_id)?;
        let request = build_request(&model, prompt, options)?;
        let attempts = AtomicU32::new(0);
        let started = Instant::now();
        let mut cost = 0.0;

        for round in 0..=EMPTY_RESPONSE_REISSUES {
            let response = self
                .issue_with_retries(provider.as_ref(), &request, options, &attempts, meter)
                .await?;
            cost += response.cost;

            if !response.text.trim().is_empty() {
                let attempts = attempts.load(Ordering::SeqCst);
                info!(
                    provider = provider.name(),
                    model = %model,
                    attempts,
                    cost,
                    "Model call succeeded"
                );
                return Ok(ModelResponse {
                    text: response.text,
                    model,
                    provider: provider.name().to_string(),
                    attempts,
                    cost,
                    elapsed: started.elapsed(),
                });
            }

            warn!(round, model = %model, "Model returned an empty response");
        }

        Err(ValidationError::new(ValidationErrorKind::EmptyResponse(model_id.to_string())).into())
    }

    /// Run the retry loop for one logical request.
    async fn issue_with_retries(
        &self,
        provider: &dyn ModelProvider,
        request: &GenerationRequest,
        options: &InvokeOptions,
        attempts: &AtomicU32,
        meter: &SpendMeter,
    ) -> QuillResult<ProviderResponse> {
        let strategy = ExponentialFactorBackoff::from_millis(
            self.backoff_base.as_millis() as u64,
            2.0,
        )
        .max_delay(self.backoff_max)
        .map(jitter)
        .take(options.max_retries as usize);

        Retry::spawn(strategy, || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            async move { self.attempt(provider, request, options, attempt, meter).await }
        })
        .await
    }

    /// Issue a single attempt, recording its outcome.
    async fn attempt(
        &self,
        provider: &dyn ModelProvider,
        request: &GenerationRequest,
        options: &InvokeOptions,
        attempt: u32,
        meter: &SpendMeter,
    ) -> Result<ProviderResponse, RetryError<QuillError>> {
        let estimate = options
            .estimated_cost
            .unwrap_or_else(|| provider.estimate_cost(request));

        let reservation = match self.budget.reserve(estimate) {
            Ok(reservation) => reservation,
            Err(e) => {
                warn!(attempt, estimate, "Budget refused model call");
                self.record(provider, request, attempt, CallOutcome::BudgetRefused, Duration::ZERO, 0.0, Some(e.to_string()));
                return Err(RetryError::Permanent(e.into()));
            }
        };

        debug!(attempt, estimate, "Issuing model call");
        let started = Instant::now();
        let result = tokio::time::timeout(options.timeout, provider.generate(request)).await;
        let elapsed = started.elapsed();
        let metrics = LlmMetrics::get();

        match result {
            Ok(Ok(response)) => {
                let cost = reservation.commit(response.cost);
                meter.add(cost);
                metrics.record_request(
                    provider.name(),
                    request.model(),
                    elapsed.as_secs_f64(),
                    response.input_tokens,
                    response.output_tokens,
                    cost,
                );
                let outcome = if response.text.trim().is_empty() {
                    CallOutcome::EmptyResponse
                } else {
                    CallOutcome::Success
                };
                self.record(provider, request, attempt, outcome, elapsed, cost, None);
                Ok(response)
            }
            Ok(Err(e)) => {
                drop(reservation);
                let outcome = if e.is_retryable() {
                    CallOutcome::Transient
                } else {
                    CallOutcome::Permanent
                };
                metrics.record_error(provider.name(), request.model(), outcome);
                self.record(provider, request, attempt, outcome, elapsed, 0.0, Some(e.to_string()));
                Err(classify(e))
            }
            Err(_) => {
                drop(reservation);
                let e = ProviderError::new(ProviderErrorKind::Timeout(
                    options.timeout.as_millis() as u64,
                ));
                metrics.record_error(provider.name(), request.model(), CallOutcome::Timeout);
                self.record(provider, request, attempt, CallOutcome::Timeout, elapsed, 0.0, Some(e.to_string()));
                Err(classify(e))
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn record(
        &self,
        provider: &dyn ModelProvider,
        request: &GenerationRequest,
        attempt: u32,
        outcome: CallOutcome,
        elapsed: Duration,
        cost: f64,
        error: Option<String>,
    ) {
        let built = ModelCallRecordBuilder::default()
            .provider(provider.name())
            .model(request.model().as_str())
            .attempt(attempt)
            .elapsed_ms(elapsed.as_millis() as u64)
            .cost(cost)
            .outcome(outcome)
            .error(error)
            .build();

        match built {
            Ok(record) => self
                .records
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(record),
            Err(e) => warn!(error = %e, "Dropping incomplete call record"),
        }
    }
}

fn build_request(
    model: &str,
    prompt: &str,
    options: &InvokeOptions,
) -> Result<GenerationRequest, ProviderError> {
    GenerationRequestBuilder::default()
        .model(model)
        .prompt(prompt)
        .max_output_tokens(options.max_output_tokens)
        .build()
        .map_err(|e| ProviderError::new(ProviderErrorKind::MalformedRequest(e.to_string())))
}

fn classify(error: ProviderError) -> RetryError<QuillError> {
    if error.is_retryable() {
        warn!(error = %error, "Transient error, will retry");
        RetryError::Transient {
            err: error.into(),
            retry_after: None,
        }
    } else {
        RetryError::Permanent(error.into())
    }
}
