//! Core data types for the Quill fiction pipeline.
//!
//! This crate provides the data model shared by every other crate: pipeline
//! stages, outline acts and templates, scenes and stories, revision requests,
//! model call telemetry, and the scene transition classifier consulted when
//! assembling a manuscript.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod act;
mod output;
mod record;
mod revision;
mod scene;
mod stage;
mod telemetry;
mod templates;
mod transition;
mod world;

pub use act::{ACT_FRACTION_TOLERANCE, Act, renumber_acts, validate_acts};
pub use output::{Manuscript, StageOutput};
pub use record::{CallOutcome, ModelCallRecord, ModelCallRecordBuilder};
pub use revision::{Feedback, RevisionRequest};
pub use scene::{SceneSequel, Story, word_count};
pub use stage::Stage;
pub use telemetry::{LogFormat, init_tracing};
pub use templates::{OutlineTemplate, TemplateLibrary};
pub use transition::{SceneTransition, classify, transitions};
pub use world::{Character, Location, Premise};
