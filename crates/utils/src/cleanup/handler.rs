//! RAII snapshot of a file's bytes taken before a correction tool runs.
//!
//! The snapshot is armed on creation. `commit` disarms it once the new
//! content has been verified; any other exit path (early return, error,
//! timeout, panic unwinding through the owner) writes the original bytes
//! back when the guard is dropped.

use std::fs;
use std::path::{Path, PathBuf};
use syntaxfix_core::{Error, Result};

pub struct FileSnapshot {
    path: PathBuf,
    original: Vec<u8>,
    armed: bool,
}

impl FileSnapshot {
    /// Snapshot the current content of `path`
    pub fn capture(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let original = fs::read(&path).map_err(|e| Error::file_system(&path, "snapshot", e))?;
        Ok(Self::from_bytes(path, original))
    }

    /// Build a snapshot from bytes the caller already read
    pub fn from_bytes(path: impl Into<PathBuf>, original: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            original,
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The bytes as they were when the snapshot was taken
    pub fn original(&self) -> &[u8] {
        &self.original
    }

    /// Accept whatever is on disk now
    pub fn commit(mut self) {
        self.armed = false;
    }

    /// Put the original bytes back, reporting failures to the caller
    pub fn restore(mut self) -> Result<bool> {
        self.armed = false;
        restore_bytes(&self.path, &self.original)
    }
}

impl Drop for FileSnapshot {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match restore_bytes(&self.path, &self.original) {
            Ok(true) => ::tracing::debug!(path = %self.path.display(), "restored file snapshot"),
            Ok(false) => {}
            Err(e) => ::tracing::error!(
                path = %self.path.display(),
                error = %e,
                "failed to restore file snapshot"
            ),
        }
    }
}

/// Returns whether a write was needed. Identical content is left alone so
/// the modification time of an untouched file does not move.
fn restore_bytes(path: &Path, original: &[u8]) -> Result<bool> {
    if let Ok(current) = fs::read(path) {
        if current == original {
            return Ok(false);
        }
    }
    fs::write(path, original).map_err(|e| Error::file_system(path, "restore snapshot", e))?;
    Ok(true)
}
