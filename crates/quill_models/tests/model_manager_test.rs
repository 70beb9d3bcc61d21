//! Tests for retry, timeout, budget and telemetry behavior.

mod test_utils;

use quill_core::CallOutcome;
use quill_error::{ErrorCategory, ProviderErrorKind, QuillErrorKind};
use quill_models::{CostBudget, InvokeOptions, ModelManager, ProviderRegistry, SpendMeter};
use std::sync::Arc;
use std::time::Duration;
use test_utils::{MockProvider, MockResponse};

fn manager(provider: Arc<MockProvider>) -> ModelManager {
    ModelManager::new(ProviderRegistry::new().with(provider), "mock:mock-writer")
        .with_backoff(Duration::from_millis(100), Duration::from_secs(5))
}

fn options(max_retries: u32) -> InvokeOptions {
    InvokeOptions::default()
        .with_timeout(Duration::from_secs(600))
        .with_max_retries(max_retries)
}

#[tokio::test(start_paused = true)]
async fn timeouts_then_success_records_every_attempt() -> anyhow::Result<()> {
    let provider = Arc::new(MockProvider::new_sequence(
        vec![MockResponse::Hang, MockResponse::Hang],
        MockResponse::Text("The tide came in.".to_string()),
    ));
    let manager = manager(Arc::clone(&provider));

    let response = manager
        .invoke("Write a line.", "mock:mock-writer", &options(3))
        .await?;

    assert_eq!(response.text(), "The tide came in.");
    assert_eq!(*response.attempts(), 3);
    assert_eq!(response.retries(), 2);

    let records = manager.records();
    assert_eq!(records.len(), 3);
    let outcomes: Vec<CallOutcome> = records.iter().map(|r| *r.outcome()).collect();
    assert_eq!(
        outcomes,
        vec![CallOutcome::Timeout, CallOutcome::Timeout, CallOutcome::Success]
    );
    let attempts: Vec<u32> = records.iter().map(|r| *r.attempt()).collect();
    assert_eq!(attempts, vec![1, 2, 3]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn exhausted_timeouts_surface_as_timeout() {
    let provider = Arc::new(MockProvider::new_sequence(Vec::new(), MockResponse::Hang));
    let manager = manager(Arc::clone(&provider));

    let err = manager
        .invoke("Write a line.", "mock:mock-writer", &options(2))
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Timeout);
    assert_eq!(provider.call_count(), 3);
    assert_eq!(manager.records().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn transient_errors_are_retried() -> anyhow::Result<()> {
    let provider = Arc::new(MockProvider::new_sequence(
        vec![
            MockResponse::Error(ProviderErrorKind::from_status(503, "overloaded")),
            MockResponse::Error(ProviderErrorKind::RateLimited("slow down".to_string())),
        ],
        MockResponse::Text("ok".to_string()),
    ));
    let manager = manager(Arc::clone(&provider));

    let response = manager
        .invoke("prompt", "mock:mock-writer", &options(3))
        .await?;
    assert_eq!(response.retries(), 2);
    let outcomes: Vec<CallOutcome> = manager.records().iter().map(|r| *r.outcome()).collect();
    assert_eq!(outcomes[0], CallOutcome::Transient);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn permanent_errors_fail_immediately() {
    let provider = Arc::new(MockProvider::new_sequence(
        Vec::new(),
        MockResponse::Error(ProviderErrorKind::from_status(401, "bad key")),
    ));
    let manager = manager(Arc::clone(&provider));

    let err = manager
        .invoke("prompt", "mock:mock-writer", &options(3))
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::ProviderPermanent);
    assert_eq!(provider.call_count(), 1);
    assert_eq!(*manager.records()[0].outcome(), CallOutcome::Permanent);
}

#[tokio::test]
async fn unknown_model_is_permanent_and_unrecorded() {
    let provider = Arc::new(MockProvider::new_success("unused"));
    let manager = manager(Arc::clone(&provider));

    let err = manager
        .invoke("prompt", "other:gpt-9", &options(3))
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::ProviderPermanent);
    assert_eq!(provider.call_count(), 0);
    assert!(manager.records().is_empty());
}

#[tokio::test]
async fn bare_model_names_resolve_through_handles() -> anyhow::Result<()> {
    let provider = Arc::new(MockProvider::new_success("hello"));
    let manager = manager(Arc::clone(&provider));

    let response = manager.invoke("prompt", "mock-bare", &options(0)).await?;
    assert_eq!(response.provider(), "mock");
    assert_eq!(response.model(), "mock-bare");
    Ok(())
}

#[tokio::test]
async fn empty_response_is_reissued_once() -> anyhow::Result<()> {
    let provider = Arc::new(MockProvider::new_sequence(
        vec![MockResponse::Text("   \n".to_string())],
        MockResponse::Text("Second try.".to_string()),
    ));
    let manager = manager(Arc::clone(&provider));

    let response = manager.invoke("prompt", "mock:mock-writer", &options(3)).await?;
    assert_eq!(response.text(), "Second try.");
    assert_eq!(*response.attempts(), 2);
    assert_eq!(provider.prompts(), vec!["prompt".to_string(), "prompt".to_string()]);
    assert_eq!(*manager.records()[0].outcome(), CallOutcome::EmptyResponse);
    Ok(())
}

#[tokio::test]
async fn persistent_empty_response_is_a_validation_error() {
    let provider = Arc::new(MockProvider::new_success(""));
    let manager = manager(Arc::clone(&provider));

    let err = manager
        .invoke("prompt", "mock:mock-writer", &options(3))
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Validation);
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn meter_counts_billed_attempts_of_a_failed_call() {
    let provider = Arc::new(MockProvider::new_success("").with_cost(0.02));
    let manager = manager(Arc::clone(&provider));
    let meter = SpendMeter::new();

    let err = manager
        .invoke_metered("prompt", "mock:mock-writer", &options(3), &meter)
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::Validation);
    assert!((meter.total() - 0.04).abs() < 1e-9);
    assert!((meter.total() - manager.total_cost()).abs() < 1e-9);
}

#[tokio::test]
async fn budget_refusal_happens_before_the_call() {
    let provider = Arc::new(MockProvider::new_success("text").with_estimate(0.5));
    let manager =
        manager(Arc::clone(&provider)).with_budget(CostBudget::with_ceiling(0.1).unwrap());

    let err = manager
        .invoke("prompt", "mock:mock-writer", &options(3))
        .await
        .unwrap_err();

    assert_eq!(err.category(), ErrorCategory::BudgetExceeded);
    assert!(matches!(err.kind(), QuillErrorKind::Budget(_)));
    assert_eq!(provider.call_count(), 0);
    assert_eq!(*manager.records()[0].outcome(), CallOutcome::BudgetRefused);
    assert_eq!(manager.budget().spent(), 0.0);
}

#[tokio::test]
async fn actual_cost_is_committed_to_the_budget() -> anyhow::Result<()> {
    let provider = Arc::new(
        MockProvider::new_success("text")
            .with_estimate(0.05)
            .with_cost(0.03),
    );
    let manager =
        manager(Arc::clone(&provider)).with_budget(CostBudget::with_ceiling(1.0).unwrap());

    let response = manager.invoke("prompt", "mock:mock-writer", &options(0)).await?;
    assert!((response.cost() - 0.03).abs() < 1e-12);
    assert!((manager.budget().spent() - 0.03).abs() < 1e-12);
    assert_eq!(manager.budget().reserved(), 0.0);
    assert!((manager.total_cost() - 0.03).abs() < 1e-12);
    Ok(())
}

#[tokio::test]
async fn records_export_as_json_lines() -> anyhow::Result<()> {
    let provider = Arc::new(MockProvider::new_sequence(
        vec![MockResponse::Error(ProviderErrorKind::Network("reset".to_string()))],
        MockResponse::Text("fine".to_string()),
    ));
    let manager = manager(Arc::clone(&provider)).with_backoff(Duration::ZERO, Duration::ZERO);
    manager.invoke("prompt", "mock:mock-writer", &options(1)).await?;

    let mut buffer = Vec::new();
    let written = manager.export_records_jsonl(&mut buffer)?;
    assert_eq!(written, 2);

    let text = String::from_utf8(buffer)?;
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines[0]["outcome"], "transient");
    assert_eq!(lines[1]["outcome"], "success");
    assert_eq!(lines[1]["provider"], "mock");
    Ok(())
}
