//! Quill - staged fiction production over LLM providers
//!
//! Quill moves a story through a dependency-ordered pipeline of generation
//! stages: idea, characters and locations, outline, scene breakdown, prose,
//! revision and export. Every stage output is versioned and persisted;
//! re-running a stage marks everything downstream stale.
//!
//! # Features
//!
//! - **Staged projects**: prerequisite checks, versioned commits, staleness
//! - **Resilient model calls**: retry with backoff, timeouts, cost budgets
//! - **Revisions**: scene-level rewrites within a spend limit
//! - **Scene transitions**: deterministic break classification for export
//! - **Telemetry**: per-call records exportable as JSON lines
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use quill::{FileSystemProjectStore, ModelManager, QuillConfig, Stage, StageRunner};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = QuillConfig::load()?;
//!     let store = Arc::new(FileSystemProjectStore::new(config.storage.project_root())?);
//!     let runner = StageRunner::new(ModelManager::from_config(&config)?, store)
//!         .with_settings(config.pipeline.clone());
//!
//!     let mut project = runner.create_project("The Lighthouse", "").await?;
//!     runner.run_through(&mut project, Stage::Export).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - `quill_error` - Error types and categories
//! - `quill_core` - Data model, outline templates, scene transitions
//! - `quill_interface` - `ModelProvider` trait
//! - `quill_config` - Layered TOML configuration
//! - `quill_models` - `ModelManager`, budgets, providers
//! - `quill_storage` - Project state and stores
//! - `quill_pipeline` - `StageRunner` and `RevisionEngine`
//!
//! This crate re-exports everything for convenience.

pub use quill_config::*;
pub use quill_core::*;
pub use quill_error::*;
pub use quill_interface::*;
pub use quill_models::{
    BudgetReservation, CostBudget, InvokeOptions, LlmMetrics, ModelManager, ModelResponse,
    OpenAiCompatibleProvider, ProviderRegistry,
};
pub use quill_pipeline::{
    DefaultPromptComposer, HaltReason, PromptComposer, PromptContext, RevisionEngine,
    RevisionOutcome, SkipReason, StageRunner, UnappliedRevision, assemble_manuscript,
};
pub use quill_storage::{
    FileSystemProjectStore, InMemoryProjectStore, Project, ProjectLock, ProjectRepository,
    ProjectSummary, StageRecord, StageStatus,
};
