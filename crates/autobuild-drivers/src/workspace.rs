//! Run-scoped temporary storage and the build-log handle.
//!
//! The builder's logging channel writes the identifier assigned by the log
//! collector to the file named by `BUILD_LOG_ID_FILE`. That file is the
//! [`LogHandle`]: created empty right before a build, read exactly once
//! after it, and removed afterwards or on drop. The whole directory goes away
//! when the [`RunWorkspace`] is dropped.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

/// Environment variable naming the log-identifier file for the builder.
pub const BUILD_LOG_ID_FILE: &str = "BUILD_LOG_ID_FILE";

const LOG_HANDLE_NAME: &str = "build-log-id";

/// Temporary directory owned by one run.
#[derive(Debug)]
pub struct RunWorkspace {
    dir: TempDir,
}

impl RunWorkspace {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("autobuild-").tempdir()?;
        debug!(path = %dir.path().display(), "created run workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Start a fresh log handle, deleting whatever a previous attempt left.
    pub fn log_handle(&self) -> std::io::Result<LogHandle> {
        LogHandle::create(self.dir.path().join(LOG_HANDLE_NAME))
    }

    /// Remove a leftover log handle, if any.
    pub fn clear_log_handle(&self) {
        remove_quietly(&self.dir.path().join(LOG_HANDLE_NAME));
    }
}

/// File-backed slot for one build's log identifier.
#[derive(Debug)]
pub struct LogHandle {
    path: PathBuf,
}

impl LogHandle {
    fn create(path: PathBuf) -> std::io::Result<Self> {
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the identifier and delete the handle. Blank or missing content
    /// yields `None`.
    pub fn take(self) -> Option<String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

impl Drop for LogHandle {
    fn drop(&mut self) {
        remove_quietly(&self.path);
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            debug!(path = %path.display(), error = %e, "could not remove log handle");
        }
    }
}
