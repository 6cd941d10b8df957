//! Liveness marker read by external supervisors.
//!
//! The marker holds the agent pid as ASCII decimal once startup succeeds, or
//! [`FAILURE_SENTINEL`] when startup failed. It is a status channel only:
//! nothing prevents two agents from overwriting each other's marker.

use std::fs::{self, DirBuilder, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use chaos_config::RuntimePaths;

use super::PROCESS_TARGET;

/// Value written when startup fails.
pub const FAILURE_SENTINEL: i64 = -1;

#[cfg(unix)]
const MARKER_MODE: u32 = 0o644;

/// Errors raised while writing the liveness marker.
#[derive(Debug, Error)]
pub enum LivenessWriteError {
    /// The marker path has no parent directory.
    #[error("liveness path '{}' has no parent directory", path.display())]
    MissingParent {
        /// Marker path.
        path: PathBuf,
    },
    /// Creating or replacing the marker failed.
    #[error("failed to write liveness marker '{}': {source}", path.display())]
    Write {
        /// Marker path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Handle on the liveness marker file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LivenessMarker {
    path: PathBuf,
}

impl LivenessMarker {
    /// Marker at an explicit path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Marker at the configured runtime location.
    #[must_use]
    pub fn from_paths(paths: &RuntimePaths) -> Self {
        Self::new(paths.liveness_path())
    }

    /// Marker path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Replaces the marker content with `value`.
    pub fn write(&self, value: i64) -> Result<(), LivenessWriteError> {
        let directory = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => {
                return Err(LivenessWriteError::MissingParent {
                    path: self.path.clone(),
                });
            }
        };
        let write_error = |source| LivenessWriteError::Write {
            path: self.path.clone(),
            source,
        };
        DirBuilder::new()
            .recursive(true)
            .create(directory)
            .map_err(write_error)?;
        write_in_place(&self.path, value.to_string().as_bytes()).map_err(write_error)?;
        info!(
            target: PROCESS_TARGET,
            value,
            file = %self.path.display(),
            "liveness marker written"
        );
        Ok(())
    }

    /// Records a running agent.
    pub fn write_pid(&self, pid: u32) -> Result<(), LivenessWriteError> {
        self.write(i64::from(pid))
    }

    /// Records a failed startup.
    pub fn write_failure(&self) -> Result<(), LivenessWriteError> {
        self.write(FAILURE_SENTINEL)
    }

    /// Current marker content, verbatim.
    pub fn read(&self) -> io::Result<String> {
        fs::read_to_string(&self.path)
    }
}

/// Opens the marker (creating it if absent), truncates it and writes
/// `contents`. Symlinked markers are written through to their target.
fn write_in_place(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(MARKER_MODE);
    }

    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
