use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use syntaxfix_core::{Error, Result};

/// Identity of a file's on-disk state at one instant
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileStamp {
    pub path: PathBuf,
    /// Modification time in nanoseconds since the Unix epoch
    pub mtime_nanos: u128,
    pub size: u64,
}

impl FileStamp {
    /// Read the current stamp of `path`
    pub fn of(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path).map_err(|e| Error::file_system(path, "stat", e))?;
        let modified = metadata
            .modified()
            .map_err(|e| Error::file_system(path, "read modification time", e))?;

        Ok(Self {
            path: path.to_path_buf(),
            mtime_nanos: nanos_since_epoch(modified),
            size: metadata.len(),
        })
    }

    /// Stable hex digest of (path, mtime)
    #[must_use]
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.path.to_string_lossy().as_bytes());
        hasher.update(b":");
        hasher.update(self.mtime_nanos.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Whether the file still has the same modification time
    #[must_use]
    pub fn is_current(&self) -> bool {
        match Self::of(&self.path) {
            Ok(now) => now.mtime_nanos == self.mtime_nanos,
            Err(_) => false,
        }
    }
}

fn nanos_since_epoch(time: SystemTime) -> u128 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(duration) => duration.as_nanos(),
        // Pre-epoch timestamps still need a distinct key
        Err(e) => u128::MAX - e.duration().as_nanos(),
    }
}
