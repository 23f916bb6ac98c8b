//! Per-build workspace directories.
//!
//! Every build gets its own directory named by a fresh [`WorkspaceId`], so
//! concurrent builds never share mutable filesystem state and need no locking.
//!
//! [`Workspace`] is a scoped guard: dropping it deletes the directory on every
//! exit path, success or failure, unless [`Workspace::retain`] was called.
//! Callers on the runtime should finish with [`Workspace::close`], which does
//! the removal on the blocking pool; the synchronous `Drop` path remains for
//! cancelled or panicking builds.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{BuildError, BuildStage, WorkspaceId};

/// The writable directory under which workspaces are allocated.
#[derive(Debug, Clone)]
pub struct WorkspaceRoot {
    path: PathBuf,
}

impl WorkspaceRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates a new, empty workspace directory.
    ///
    /// The root is created if missing. The workspace itself is created with
    /// `create_dir` (not `create_dir_all`), so an identifier collision fails
    /// instead of silently sharing a directory.
    pub async fn allocate(&self) -> Result<Workspace, BuildError> {
        tokio::fs::create_dir_all(&self.path)
            .await
            .map_err(|e| BuildError::resource(BuildStage::Allocated, &self.path, e))?;

        let id = WorkspaceId::new_random();
        let dir = self.path.join(id.to_string());
        tokio::fs::create_dir(&dir)
            .await
            .map_err(|e| BuildError::resource(BuildStage::Allocated, &dir, e))?;

        debug!(workspace_id = %id, dir = %dir.display(), "workspace allocated");
        Ok(Workspace {
            id,
            dir,
            retained: false,
            closed: false,
        })
    }
}

/// One build's isolated directory.
#[derive(Debug)]
pub struct Workspace {
    id: WorkspaceId,
    dir: PathBuf,
    retained: bool,
    closed: bool,
}

impl Workspace {
    pub fn id(&self) -> WorkspaceId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Path of `file_name` inside the workspace.
    pub fn file(&self, file_name: &str) -> PathBuf {
        self.dir.join(file_name)
    }

    /// Keeps the directory on disk after this guard is dropped.
    pub fn retain(&mut self) {
        self.retained = true;
    }

    pub fn is_retained(&self) -> bool {
        self.retained
    }

    /// Releases the workspace without blocking a runtime worker thread.
    ///
    /// Removal failures are logged, never returned.
    pub async fn close(mut self) {
        if self.retained {
            return;
        }
        let result = tokio::fs::remove_dir_all(&self.dir).await;
        self.log_removal(result);
        self.closed = true;
    }

    fn log_removal(&self, result: std::io::Result<()>) {
        match result {
            Ok(()) => debug!(workspace_id = %self.id, "workspace removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(workspace_id = %self.id, error = %e, "failed to remove workspace"),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if self.retained {
            info!(workspace_id = %self.id, dir = %self.dir.display(), "workspace retained");
            return;
        }
        let result = std::fs::remove_dir_all(&self.dir);
        self.log_removal(result);
    }
}
