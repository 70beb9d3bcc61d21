//! Stage execution for the Quill fiction pipeline.
//!
//! [`StageRunner`] drives a [`Project`](quill_storage::Project) through its
//! stages: it checks prerequisites, composes prompts with a
//! [`PromptComposer`], calls the [`ModelManager`](quill_models::ModelManager),
//! validates the response's shape and commits the result through the
//! project store. [`RevisionEngine`] rewrites individual scenes of committed
//! prose, and [`assemble_manuscript`] renders the EXPORT output.
//!
//! # Example
//!
//! ```no_run
//! use quill_config::QuillConfig;
//! use quill_core::Stage;
//! use quill_models::ModelManager;
//! use quill_pipeline::StageRunner;
//! use quill_storage::FileSystemProjectStore;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = QuillConfig::load()?;
//! let store = Arc::new(FileSystemProjectStore::new(config.storage.project_root())?);
//! let runner = StageRunner::new(ModelManager::from_config(&config)?, store)
//!     .with_settings(config.pipeline.clone());
//!
//! let mut project = runner.create_project("The Lighthouse", "A quiet ghost story").await?;
//! runner.run_through(&mut project, Stage::Export).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod export;
mod extraction;
mod prompts;
mod revision;
mod runner;
mod shapes;

pub use export::{ORNAMENTAL_BREAK, assemble_manuscript};
pub use extraction::{extract_json, parse_json};
pub use prompts::{
    DefaultPromptComposer, PromptComposer, PromptContext, REVISE_PROMPT, SCENE_PROMPT,
    render_template,
};
pub use revision::{HaltReason, RevisionEngine, RevisionOutcome, SkipReason, UnappliedRevision};
pub use runner::StageRunner;
pub use shapes::{parse_replacement, parse_scene_prose, parse_stage_output};
