//! Project state persistence for Quill.
//!
//! A [`Project`] holds one [`StageRecord`] per committed stage. Records carry
//! a version, a staleness flag and a SHA-256 digest of their output that is
//! checked on every load.
//!
//! Stores implement [`ProjectRepository`]:
//!
//! - [`FileSystemProjectStore`] writes `<root>/<id>/project.json` with
//!   temp-file-and-rename and guards runs with a lock file naming its
//!   [`LockOwner`]. A lock left behind by a process that has exited is
//!   reclaimed by the next run.
//! - [`InMemoryProjectStore`] keeps everything in process, for tests.
//!
//! # Example
//!
//! ```rust
//! use quill_core::{Premise, Stage, StageOutput};
//! use quill_storage::{InMemoryProjectStore, Project, ProjectRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryProjectStore::new();
//! let mut project = Project::new("The Lighthouse", "openai:gpt-4o-mini");
//! project.commit(
//!     Stage::Idea,
//!     StageOutput::Idea(Premise { title: None, text: "A keeper finds a letter.".into() }),
//!     None,
//!     0.0,
//! )?;
//! store.save(&project).await?;
//!
//! let loaded = store.load(*project.id()).await?;
//! assert_eq!(loaded, project);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod lock;
mod memory;
mod project;
mod repository;

pub use filesystem::FileSystemProjectStore;
pub use lock::LockOwner;
pub use memory::InMemoryProjectStore;
pub use project::{Project, StageRecord, StageStatus, output_digest};
pub use repository::{ProjectLock, ProjectRepository, ProjectSummary};
pub use quill_error::{StorageError, StorageErrorKind};
