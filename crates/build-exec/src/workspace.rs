use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::debug;

/// File name the manifest builder expects inside its working directory.
pub const CONFIG_FILE_NAME: &str = "kustomization.yaml";

const WORKSPACE_PREFIX: &str = "kustomize-build-";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("Failed to create build workspace under {root}: {source}")]
    Create { root: PathBuf, source: io::Error },
    #[error("Failed to write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("Failed to remove build workspace {path}: {source}")]
    Release { path: PathBuf, source: io::Error },
}

/// A per-request scratch directory holding exactly one `kustomization.yaml`.
///
/// The directory is removed by [`Workspace::release`]; if the handle is dropped
/// without being released (early return, panic) the directory is still removed.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a uniquely named directory under `root`.
    pub fn acquire(root: &Path) -> Result<Self, WorkspaceError> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)
            .map_err(|source| WorkspaceError::Create {
                root: root.to_path_buf(),
                source,
            })?;
        debug!(workspace = %dir.path().display(), "acquired build workspace");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join(CONFIG_FILE_NAME)
    }

    pub fn write_config(&self, content: &str) -> Result<PathBuf, WorkspaceError> {
        let path = self.config_path();
        fs::write(&path, content).map_err(|source| WorkspaceError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Remove the directory. One that is already gone counts as released.
    pub fn release(self) -> Result<(), WorkspaceError> {
        let path = self.dir.path().to_path_buf();
        match self.dir.close() {
            Ok(()) => {
                debug!(workspace = %path.display(), "released build workspace");
                Ok(())
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => {
                debug!(workspace = %path.display(), "build workspace was already removed");
                Ok(())
            }
            Err(source) => Err(WorkspaceError::Release { path, source }),
        }
    }
}
