//! Cache entries

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use syntaxfix_core::FixOutcome;
use syntaxfix_utils::FileStamp;

/// The last outcome recorded for one `(path, mtime)` pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub stamp: FileStamp,
    pub outcome: FixOutcome,
    pub stored_at: SystemTime,
}

impl CacheEntry {
    pub fn new(stamp: FileStamp, outcome: FixOutcome) -> Self {
        Self {
            stamp,
            outcome,
            stored_at: SystemTime::now(),
        }
    }

    /// Whether this entry still describes `current`
    pub fn matches(&self, current: &FileStamp) -> bool {
        self.stamp.path == current.path && self.stamp.mtime_nanos == current.mtime_nanos
    }
}
