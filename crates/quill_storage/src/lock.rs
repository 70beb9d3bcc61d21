//! Lock file ownership and recovery of locks left by exited processes.

use chrono::{DateTime, Utc};
use quill_error::{QuillResult, StorageError, StorageErrorKind};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Unreadable lock files younger than this may still be mid-write.
const UNREADABLE_GRACE: Duration = Duration::from_secs(30);

/// Contents of a project lock file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockOwner {
    /// Process holding the lock
    pub pid: u32,
    /// When the lock was taken
    pub acquired_at: DateTime<Utc>,
}

impl LockOwner {
    /// Owner record for this process, stamped now.
    pub fn current() -> Self {
        Self {
            pid: std::process::id(),
            acquired_at: Utc::now(),
        }
    }

    /// Whether the owning process has exited.
    ///
    /// Never true for this process: a guard leaked here is still held.
    pub fn is_abandoned(&self) -> bool {
        self.pid != std::process::id() && !process_alive(self.pid)
    }
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn process_alive(pid: u32) -> bool {
    let pid = match libc::pid_t::try_from(pid) {
        Ok(pid) if pid > 0 => pid,
        _ => return true,
    };
    // Signal 0 only checks that the process exists.
    if unsafe { libc::kill(pid, 0) } == 0 {
        return true;
    }
    std::io::Error::last_os_error().raw_os_error() != Some(libc::ESRCH)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

/// Create the lock file at `path` holding `owner`.
///
/// Returns `Ok(false)` if a lock file already exists.
pub(crate) async fn try_create(path: &Path, owner: &LockOwner) -> QuillResult<bool> {
    let contents = serde_json::to_vec(owner).map_err(|e| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "encode lock owner: {}",
            e
        )))
    })?;

    let mut file = match tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
    {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(write_error(path, e).into()),
    };

    let written = async {
        file.write_all(&contents).await?;
        file.sync_all().await
    }
    .await;
    if let Err(e) = written {
        drop(file);
        let _ = tokio::fs::remove_file(path).await;
        return Err(write_error(path, e).into());
    }
    Ok(true)
}

/// Remove the lock file at `path` if its owner has exited.
///
/// Returns true when the path is free to take: the file was removed, or was
/// already gone. An unreadable file counts as abandoned only once it is older
/// than a short grace period. Two processes reclaiming the same stale lock
/// both re-read it before removing, which narrows but does not close the
/// window in which one removes the other's fresh lock.
#[tracing::instrument]
pub(crate) async fn reclaim_if_abandoned(path: &Path) -> QuillResult<bool> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(read_error(path, e).into()),
    };

    let abandoned = match serde_json::from_slice::<LockOwner>(&raw) {
        Ok(owner) if owner.is_abandoned() => {
            tracing::warn!(
                pid = owner.pid,
                acquired_at = %owner.acquired_at,
                "Lock owner has exited, reclaiming"
            );
            true
        }
        Ok(owner) => {
            tracing::debug!(pid = owner.pid, "Lock owner is running");
            false
        }
        Err(e) => {
            let age = match tokio::fs::metadata(path).await {
                Ok(meta) => meta
                    .modified()
                    .ok()
                    .and_then(|modified| modified.elapsed().ok())
                    .unwrap_or_default(),
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
                Err(e) => return Err(read_error(path, e).into()),
            };
            let abandoned = age > UNREADABLE_GRACE;
            tracing::warn!(error = %e, age_secs = age.as_secs(), abandoned, "Unreadable lock file");
            abandoned
        }
    };
    if !abandoned {
        return Ok(false);
    }

    match tokio::fs::read(path).await {
        Ok(current) if current != raw => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(read_error(path, e).into()),
    }
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
        Err(e) => Err(write_error(path, e).into()),
    }
}

fn write_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::new(StorageErrorKind::FileWrite(format!(
        "{}: {}",
        path.display(),
        e
    )))
}

fn read_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::new(StorageErrorKind::FileRead(format!(
        "{}: {}",
        path.display(),
        e
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn this_process_is_never_abandoned() {
        assert!(!LockOwner::current().is_abandoned());
    }

    #[cfg(unix)]
    #[test]
    fn exited_child_is_abandoned() {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();

        let owner = LockOwner {
            pid,
            acquired_at: Utc::now(),
        };
        assert!(owner.is_abandoned());
    }

    #[test]
    fn owner_round_trips_as_camel_case() {
        let json = serde_json::to_string(&LockOwner::current()).unwrap();
        assert!(json.contains("\"acquiredAt\""));
    }
}
