//! Model invocation for the Quill fiction pipeline.
//!
//! [`ModelManager`] is the single entry point for model calls. It resolves a
//! `provider:model` identifier through the [`ProviderRegistry`], reserves the
//! estimated cost against a shared [`CostBudget`], bounds each attempt with a
//! timeout, retries transient failures with exponential backoff, and records
//! one [`ModelCallRecord`](quill_core::ModelCallRecord) per attempt.
//!
//! # Example
//!
//! ```no_run
//! use quill_config::QuillConfig;
//! use quill_models::ModelManager;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = QuillConfig::load()?;
//! let manager = ModelManager::from_config(&config)?;
//! let response = manager
//!     .invoke("Pitch a ghost story in one sentence.", "openai:gpt-4o-mini", &manager.default_options())
//!     .await?;
//! println!("{} (${:.4})", response.text(), response.cost());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod budget;
mod manager;
mod metrics;
mod openai_compat;
mod registry;

pub use budget::{BudgetReservation, CostBudget, SpendMeter};
pub use manager::{InvokeOptions, ModelManager, ModelResponse};
pub use metrics::LlmMetrics;
pub use openai_compat::OpenAiCompatibleProvider;
pub use registry::ProviderRegistry;
