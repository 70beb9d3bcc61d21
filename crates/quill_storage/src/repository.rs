//! Project repository trait and run locks.

use crate::Project;
use chrono::{DateTime, Utc};
use quill_error::QuillResult;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Pluggable persistence for projects.
///
/// Saves replace the whole project state atomically: a reader sees either the
/// previous state or the new one, never a mixture.
#[async_trait::async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Persist `project`, creating or replacing its state.
    async fn save(&self, project: &Project) -> QuillResult<()>;

    /// Load a project by id.
    ///
    /// Fails with `NotFound` for unknown ids and `Corrupt` when a stage
    /// record no longer matches its digest.
    async fn load(&self, id: Uuid) -> QuillResult<Project>;

    /// Summaries of every stored project, most recently updated first.
    async fn list(&self) -> QuillResult<Vec<ProjectSummary>>;

    /// Remove a project and all of its state.
    async fn delete(&self, id: Uuid) -> QuillResult<()>;

    /// Take the single-writer lock for a project.
    ///
    /// Fails fast with `Locked` when another run holds it. The lock is
    /// released when the returned guard is dropped, or, for stores that
    /// outlive the process, reclaimed once its owner has exited.
    async fn lock(&self, id: Uuid) -> QuillResult<ProjectLock>;
}

/// Listing entry for a stored project.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProjectSummary {
    /// Project id
    pub id: Uuid,
    /// Display title
    pub title: String,
    /// Model used for new runs
    pub active_model: String,
    /// Number of stages with a committed, current output
    pub committed_stages: usize,
    /// Cumulative spend in USD
    pub spent: f64,
    /// Last commit time
    pub updated_at: DateTime<Utc>,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        let committed_stages = project
            .stages()
            .values()
            .filter(|record| *record.committed() && !*record.stale())
            .count();
        Self {
            id: *project.id(),
            title: project.title().clone(),
            active_model: project.active_model().clone(),
            committed_stages,
            spent: *project.spent(),
            updated_at: *project.updated_at(),
        }
    }
}

/// Guard for a held project lock.
#[derive(Debug)]
pub enum ProjectLock {
    /// Lock file on disk naming its owner, removed on drop
    File(PathBuf),
    /// Entry in a shared in-process set, removed on drop
    Memory {
        /// Locked project
        id: Uuid,
        /// Set of held locks
        held: Arc<Mutex<HashSet<Uuid>>>,
    },
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        match self {
            ProjectLock::File(path) => {
                if let Err(e) = std::fs::remove_file(&*path) {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to release project lock");
                } else {
                    tracing::debug!(path = %path.display(), "Released project lock");
                }
            }
            ProjectLock::Memory { id, held } => {
                held.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(id);
                tracing::debug!(project = %id, "Released project lock");
            }
        }
    }
}
