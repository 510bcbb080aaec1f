//! Concurrent outcome cache keyed by `hash(path, mtime)`

use crate::entry::CacheEntry;
use crate::stats::{CacheStats, Counters};
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use syntaxfix_core::{FixOutcome, FixStatus};
use syntaxfix_utils::FileStamp;
use tracing::{debug, trace};

/// Shared outcome cache
///
/// Cloning is cheap and every clone sees the same entries. Each path keeps at
/// most one entry: storing a new outcome for a path drops the entry recorded
/// under its previous modification time.
#[derive(Debug, Clone, Default)]
pub struct OutcomeCache {
    entries: Arc<DashMap<String, CacheEntry>>,
    keys_by_path: Arc<DashMap<PathBuf, String>>,
    counters: Arc<Counters>,
}

impl OutcomeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached outcome for the file as it is on disk right now
    ///
    /// A hit comes back with status `cache_hit`; counts, method and details
    /// are those of the original run. A file that cannot be stamped is a
    /// miss.
    pub fn lookup(&self, path: &Path) -> Option<FixOutcome> {
        let stamp = match FileStamp::of(path) {
            Ok(stamp) => stamp,
            Err(e) => {
                trace!(path = %path.display(), error = %e, "cache lookup could not stamp file");
                Counters::bump(&self.counters.misses);
                return None;
            }
        };

        let key = stamp.digest();
        let hit = self
            .entries
            .get(&key)
            .filter(|entry| entry.matches(&stamp))
            .map(|entry| entry.outcome.clone());

        match hit {
            Some(mut outcome) => {
                Counters::bump(&self.counters.hits);
                debug!(path = %path.display(), method = %outcome.method, "cache hit");
                outcome.status = FixStatus::CacheHit;
                Some(outcome)
            }
            None => {
                Counters::bump(&self.counters.misses);
                None
            }
        }
    }

    /// Record `outcome` against the file's current `(path, mtime)`
    pub fn store(&self, path: &Path, outcome: FixOutcome) {
        let stamp = match FileStamp::of(path) {
            Ok(stamp) => stamp,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "not caching outcome for unreadable file");
                return;
            }
        };

        let key = stamp.digest();
        if let Some(previous) = self.keys_by_path.insert(stamp.path.clone(), key.clone()) {
            if previous != key {
                self.entries.remove(&previous);
            }
        }
        self.entries.insert(key, CacheEntry::new(stamp, outcome));
        Counters::bump(&self.counters.stores);
    }

    /// Drop whatever is cached for `path`
    pub fn invalidate(&self, path: &Path) -> bool {
        match self.keys_by_path.remove(path) {
            Some((_, key)) => {
                self.entries.remove(&key);
                Counters::bump(&self.counters.invalidations);
                true
            }
            None => false,
        }
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.keys_by_path.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot(self.entries.len())
    }
}
