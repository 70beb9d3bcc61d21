//! Filesystem-backed project store.
//!
//! Layout:
//!
//! ```text
//! {root}/
//! ├── 6f1c.../
//! │   ├── project.json
//! │   └── project.lock   (owner pid and time, present while a run holds the project)
//! └── 9a2e.../
//!     └── project.json
//! ```

use crate::lock::{reclaim_if_abandoned, try_create};
use crate::{LockOwner, Project, ProjectLock, ProjectRepository, ProjectSummary};
use quill_error::{QuillResult, StorageError, StorageErrorKind};
use std::path::{Path, PathBuf};
use uuid::Uuid;

const STATE_FILE: &str = "project.json";
const LOCK_FILE: &str = "project.lock";

/// Project store writing one JSON state file per project.
///
/// Writes go to a temp file that is renamed over the state file, so a stage
/// output is either fully committed or absent.
#[derive(Debug, Clone)]
pub struct FileSystemProjectStore {
    root: PathBuf,
}

impl FileSystemProjectStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    #[tracing::instrument(skip(root))]
    pub fn new(root: impl Into<PathBuf>) -> QuillResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                root.display(),
                e
            )))
        })?;
        tracing::info!(path = %root.display(), "Opened project store");
        Ok(Self { root })
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding one project's files.
    pub fn project_dir(&self, id: Uuid) -> PathBuf {
        self.root.join(id.to_string())
    }

    /// Path of a project's state file.
    pub fn state_path(&self, id: Uuid) -> PathBuf {
        self.project_dir(id).join(STATE_FILE)
    }

    /// Path of a project's lock file.
    pub fn lock_path(&self, id: Uuid) -> PathBuf {
        self.project_dir(id).join(LOCK_FILE)
    }

    async fn read_project(path: &Path, id: &str) -> QuillResult<Project> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(id.to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;

        let project: Project = serde_json::from_slice(&bytes).map_err(|e| {
            StorageError::new(StorageErrorKind::Corrupt(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;
        project.verify()?;
        Ok(project)
    }
}

#[async_trait::async_trait]
impl ProjectRepository for FileSystemProjectStore {
    #[tracing::instrument(skip(self, project), fields(project = %project.id()))]
    async fn save(&self, project: &Project) -> QuillResult<()> {
        let dir = self.project_dir(*project.id());
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                dir.display(),
                e
            )))
        })?;

        let data = serde_json::to_vec_pretty(project).map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "encode project {}: {}",
                project.id(),
                e
            )))
        })?;

        let path = dir.join(STATE_FILE);
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, &data).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;
        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} to {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::debug!(path = %path.display(), size = data.len(), "Saved project state");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn load(&self, id: Uuid) -> QuillResult<Project> {
        Self::read_project(&self.state_path(id), &id.to_string()).await
    }

    #[tracing::instrument(skip(self))]
    async fn list(&self) -> QuillResult<Vec<ProjectSummary>> {
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                self.root.display(),
                e
            )))
        })?;

        let mut summaries = Vec::new();
        loop {
            let entry = entries.next_entry().await.map_err(|e| {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    self.root.display(),
                    e
                )))
            })?;
            let Some(entry) = entry else { break };

            let name = entry.file_name().to_string_lossy().to_string();
            if Uuid::parse_str(&name).is_err() {
                continue;
            }
            let path = entry.path().join(STATE_FILE);
            match Self::read_project(&path, &name).await {
                Ok(project) => summaries.push(ProjectSummary::from(&project)),
                Err(e) => tracing::warn!(project = %name, error = %e, "Skipping unreadable project"),
            }
        }

        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> QuillResult<()> {
        let dir = self.project_dir(id);
        tokio::fs::remove_dir_all(&dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(id.to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileWrite(format!(
                    "remove {}: {}",
                    dir.display(),
                    e
                )))
            }
        })?;
        tracing::info!(project = %id, "Deleted project");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn lock(&self, id: Uuid) -> QuillResult<ProjectLock> {
        let dir = self.project_dir(id);
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                dir.display(),
                e
            )))
        })?;

        let path = self.lock_path(id);
        let owner = LockOwner::current();
        let acquired = try_create(&path, &owner).await?
            || (reclaim_if_abandoned(&path).await? && try_create(&path, &owner).await?);
        if !acquired {
            return Err(StorageError::new(StorageErrorKind::Locked(id.to_string())).into());
        }

        tracing::debug!(path = %path.display(), pid = owner.pid, "Acquired project lock");
        Ok(ProjectLock::File(path))
    }
}
