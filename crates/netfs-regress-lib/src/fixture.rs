//! Fixture lifecycle
//!
//! `SuiteDir` owns the per-run working directory, `CwdGuard` undoes a
//! directory change and `Artifacts` removes whatever a case created. All
//! three release on drop, so cleanup also happens when a case body returns
//! early or panics.

use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::error::HarnessError;

/// Recursively remove `path`, whether it is a directory or a single file
pub fn remove_tree(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// The working directory of one suite run
///
/// Entering removes any leftover directory of the same name, creates it fresh
/// and makes it the current directory. Leaving restores the previous current
/// directory and removes the tree.
#[derive(Debug)]
pub struct SuiteDir {
    path: PathBuf,
    previous: PathBuf,
    left: bool,
}

impl SuiteDir {
    /// Create `path` fresh and change into it
    ///
    /// # Errors
    /// Any failure here is fatal for the run: without an isolated directory no
    /// case can execute safely.
    pub fn enter(path: impl Into<PathBuf>) -> Result<Self, HarnessError> {
        let path = path.into();
        let workdir_error = |source: io::Error| HarnessError::WorkDir {
            path: path.clone(),
            source,
        };

        let previous = std::env::current_dir().map_err(workdir_error)?;

        if fs::symlink_metadata(&path).is_ok() {
            info!("Removing leftover working directory {:?}", path);
            remove_tree(&path).map_err(workdir_error)?;
        }

        DirBuilder::new()
            .mode(0o755)
            .create(&path)
            .map_err(workdir_error)?;
        std::env::set_current_dir(&path).map_err(workdir_error)?;

        info!("Created test directory {:?} and changed to it", path);

        Ok(Self {
            path,
            previous,
            left: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that was current before entering
    pub fn previous(&self) -> &Path {
        &self.previous
    }

    /// Change back to the previous directory and remove the working directory.
    ///
    /// Best-effort: failures are logged, never raised.
    pub fn leave(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.left {
            return;
        }
        self.left = true;

        info!("Cleaning up and changing back to {:?}", self.previous);
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            warn!("Failed to change back to {:?}: {}", self.previous, e);
        }

        match remove_tree(&self.path) {
            Ok(()) => debug!("Removed working directory {:?}", self.path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove working directory {:?}: {}", self.path, e),
        }
    }
}

impl Drop for SuiteDir {
    fn drop(&mut self) {
        self.release();
    }
}

/// Restores the current directory on drop
#[derive(Debug)]
pub struct CwdGuard {
    previous: PathBuf,
}

impl CwdGuard {
    /// Change into `path`, remembering where we came from
    pub fn change_to(path: impl AsRef<Path>) -> io::Result<Self> {
        let previous = std::env::current_dir()?;
        std::env::set_current_dir(path.as_ref())?;
        Ok(Self { previous })
    }

    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for CwdGuard {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.previous) {
            warn!("Failed to change back to {:?}: {}", self.previous, e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArtifactKind {
    File,
    Dir,
    Tree,
}

/// Files and directories owned by one case
///
/// Paths are resolved against the current directory when registered and
/// removed in reverse registration order when the set is dropped. Missing
/// paths are ignored, so registering something the case removes itself is
/// harmless.
#[derive(Debug, Default)]
pub struct Artifacts {
    entries: Vec<(ArtifactKind, PathBuf)>,
}

impl Artifacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file to unlink
    pub fn file(&mut self, path: impl AsRef<Path>) {
        self.push(ArtifactKind::File, path.as_ref());
    }

    /// Register an empty directory to remove
    pub fn dir(&mut self, path: impl AsRef<Path>) {
        self.push(ArtifactKind::Dir, path.as_ref());
    }

    /// Register a directory to remove recursively
    pub fn tree(&mut self, path: impl AsRef<Path>) {
        self.push(ArtifactKind::Tree, path.as_ref());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every registered artifact now
    pub fn cleanup(&mut self) {
        while let Some((kind, path)) = self.entries.pop() {
            let res = match kind {
                ArtifactKind::File => fs::remove_file(&path),
                ArtifactKind::Dir => fs::remove_dir(&path),
                ArtifactKind::Tree => fs::remove_dir_all(&path),
            };
            match res {
                Ok(()) => debug!("Removed {:?}", path),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {:?}: {}", path, e),
            }
        }
    }

    fn push(&mut self, kind: ArtifactKind, path: &Path) {
        let resolved = if path.is_absolute() {
            path.to_path_buf()
        } else {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(path),
                Err(_) => path.to_path_buf(),
            }
        };
        self.entries.push((kind, resolved));
    }
}

impl Drop for Artifacts {
    fn drop(&mut self) {
        self.cleanup();
    }
}
