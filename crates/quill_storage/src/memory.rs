//! In-memory project store.

use crate::{Project, ProjectLock, ProjectRepository, ProjectSummary};
use quill_error::{QuillResult, StorageError, StorageErrorKind};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};
use uuid::Uuid;

/// Store that keeps projects in process memory.
///
/// Saved projects are cloned in and out, so callers never share state with
/// the store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProjectStore {
    projects: Arc<Mutex<HashMap<Uuid, Project>>>,
    held: Arc<Mutex<HashSet<Uuid>>>,
}

impl InMemoryProjectStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProjectRepository for InMemoryProjectStore {
    async fn save(&self, project: &Project) -> QuillResult<()> {
        self.projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(*project.id(), project.clone());
        Ok(())
    }

    async fn load(&self, id: Uuid) -> QuillResult<Project> {
        let project = self
            .projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(id.to_string())))?;
        project.verify()?;
        Ok(project)
    }

    async fn list(&self) -> QuillResult<Vec<ProjectSummary>> {
        let mut summaries: Vec<ProjectSummary> = self
            .projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(ProjectSummary::from)
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    async fn delete(&self, id: Uuid) -> QuillResult<()> {
        self.projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::new(StorageErrorKind::NotFound(id.to_string())).into())
    }

    async fn lock(&self, id: Uuid) -> QuillResult<ProjectLock> {
        let inserted = self
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
        if !inserted {
            return Err(StorageError::new(StorageErrorKind::Locked(id.to_string())).into());
        }
        Ok(ProjectLock::Memory {
            id,
            held: Arc::clone(&self.held),
        })
    }
}
