//! Scoped scratch-directory lifecycle.
//!
//! The upstream compiler stages its outputs in a uniquely named temporary
//! directory that must be gone by the time the build invocation completes,
//! on every exit path. [`StagingDir`] ties the recursive removal to scope
//! exit via `Drop`, with an explicit [`StagingDir::close`] for callers that
//! want deletion failures surfaced instead of swallowed.

use crate::error::{CapsuleError, Result};
use std::path::Path;
use tempfile::TempDir;
use tracing::debug;

/// A uniquely named temporary directory, recursively removed when the value
/// leaves scope
#[derive(Debug)]
pub struct StagingDir {
    dir: TempDir,
}

impl StagingDir {
    /// Create a staging directory in the system temp location
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("capsule-staging")
            .tempdir()?;
        debug!(path = %dir.path().display(), "created staging directory");
        Ok(Self { dir })
    }

    /// Create a staging directory under an explicit parent
    pub fn in_dir(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("capsule-staging")
            .tempdir_in(parent)?;
        debug!(path = %dir.path().display(), "created staging directory");
        Ok(Self { dir })
    }

    /// Path of the staging directory
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the directory now, surfacing the deletion error that `Drop`
    /// would swallow
    pub fn close(self) -> Result<()> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(|source| {
            CapsuleError::StagingCleanupFailed { path, source }
        })
    }
}
