//! Per-job temporary workspace
//!
//! Each job owns one directory under the configured workspace root, named
//! after the job id so concurrent jobs never collide. The directory is
//! removed on every exit path: the orchestrator calls [`Workspace::teardown`]
//! explicitly, and a `Drop` fallback covers paths that never reach it.
//! Removal failures are logged and never surfaced — a stuck temp dir must
//! not block subsequent jobs.

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Exclusively owned temporary directory for one job
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    job_id: String,
    torn_down: bool,
}

impl Workspace {
    /// Create the workspace directory `base/<job_id>`
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if the directory cannot be created;
    /// this is terminal for the job.
    pub fn create(base: &Path, job_id: &str) -> Result<Self> {
        let root = base.join(job_id);
        std::fs::create_dir_all(&root)?;
        tracing::debug!(path = %root.display(), "created workspace");
        Ok(Self {
            root,
            job_id: job_id.to_string(),
            torn_down: false,
        })
    }

    /// The workspace directory
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// The owning job's id
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// A path inside the workspace
    pub fn join(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Remove the workspace tree
    ///
    /// Runs exactly once; failure is logged, never raised, and never blocks
    /// later jobs.
    pub async fn teardown(mut self) {
        self.torn_down = true;
        if let Err(e) = tokio::fs::remove_dir_all(&self.root).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.root.display(),
                    error = %e,
                    "failed to remove workspace"
                );
            }
        } else {
            tracing::debug!(path = %self.root.display(), "removed workspace");
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        // Fallback for exit paths that skipped teardown (early return, panic
        // unwind). Blocking removal is acceptable here: workspaces are small
        // and this path is exceptional.
        if !self.torn_down {
            if let Err(e) = std::fs::remove_dir_all(&self.root) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %self.root.display(),
                        error = %e,
                        "failed to remove workspace in drop"
                    );
                }
            }
        }
    }
}
