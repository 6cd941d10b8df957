//! Derives the runtime artefact paths written by the agent.
//!
//! External supervisors read the liveness marker to learn whether the agent
//! came up, so the agent and any tooling inspecting it must agree on where the
//! marker lives.

use std::fs::{self, DirBuilder};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::Config;

/// Canonical paths for runtime artefacts written by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePaths {
    liveness_path: PathBuf,
}

impl RuntimePaths {
    /// Derives runtime paths from the shared configuration without touching
    /// the filesystem.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            liveness_path: config.liveness_path.as_std_path().to_path_buf(),
        }
    }

    /// Builds runtime paths around an explicit liveness marker location.
    #[must_use]
    pub fn with_liveness_path(path: impl Into<PathBuf>) -> Self {
        Self {
            liveness_path: path.into(),
        }
    }

    /// Path to the liveness marker.
    #[must_use]
    pub fn liveness_path(&self) -> &Path {
        self.liveness_path.as_path()
    }

    /// Ensures the directory holding the liveness marker exists.
    pub fn prepare(&self) -> Result<(), RuntimePathsError> {
        let parent = match self.liveness_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => {
                return Err(RuntimePathsError::MissingParent {
                    path: self.liveness_path.clone(),
                });
            }
        };
        if fs::metadata(parent).is_ok_and(|metadata| metadata.is_dir()) {
            return Ok(());
        }

        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o755);
        }
        builder
            .create(parent)
            .map_err(|source| RuntimePathsError::RuntimeDirectory {
                path: parent.to_path_buf(),
                source,
            })
    }
}

/// Errors raised while preparing agent runtime paths.
#[derive(Debug, Error)]
pub enum RuntimePathsError {
    /// The liveness path lacked a parent directory.
    #[error("liveness path '{}' has no parent directory", path.display())]
    MissingParent {
        /// Configured liveness path.
        path: PathBuf,
    },
    /// Creating the runtime directory failed.
    #[error("failed to prepare runtime directory '{}': {source}", path.display())]
    RuntimeDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
