//! Durable access records
//!
//! Usage timestamps, issued keys and run analytics live in one
//! [`StoreDocument`]. [`MemoryStore`] keeps it in process;
//! [`JsonFileStore`] keeps it in a single JSON file guarded by an exclusive
//! file lock and rewritten atomically.

use crate::analytics::AnalyticsRecord;
use crate::keys::KeyRecord;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use syntaxfix_core::{Error, Result};
use syntaxfix_utils::{read_optional, write_atomic};
use tracing::{debug, warn};

const STORE_VERSION: u32 = 1;
const MAX_ANALYTICS_RECORDS: usize = 10_000;
const LOCK_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_BACKOFF_MS: u64 = 500;

/// Persistence for usage, keys and analytics
pub trait AccessStore: Send + Sync + fmt::Debug {
    /// Stored usage timestamps for `identifier`, oldest first
    fn usage(&self, identifier: &str) -> Result<Vec<DateTime<Utc>>>;

    /// Append one usage entry for `identifier` and drop every identifier's
    /// entries older than `expire_before`, as a single write. Returns how
    /// many expired entries went away.
    fn record_usage(
        &self,
        identifier: &str,
        at: DateTime<Utc>,
        expire_before: DateTime<Utc>,
    ) -> Result<usize>;

    fn key(&self, api_key: &str) -> Result<Option<KeyRecord>>;

    fn insert_key(&self, record: KeyRecord) -> Result<()>;

    /// Bump a key's lifetime fix count and last-used time
    fn record_key_use(&self, api_key: &str, fixes: usize, at: DateTime<Utc>) -> Result<()>;

    fn record_analytics(&self, record: AnalyticsRecord) -> Result<()>;

    fn analytics(&self) -> Result<Vec<AnalyticsRecord>>;
}

/// Everything the store persists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    pub version: u32,
    #[serde(default)]
    pub usage: BTreeMap<String, Vec<DateTime<Utc>>>,
    #[serde(default)]
    pub keys: BTreeMap<String, KeyRecord>,
    #[serde(default)]
    pub analytics: Vec<AnalyticsRecord>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: STORE_VERSION,
            usage: BTreeMap::new(),
            keys: BTreeMap::new(),
            analytics: Vec::new(),
        }
    }
}

impl StoreDocument {
    fn usage(&self, identifier: &str) -> Vec<DateTime<Utc>> {
        self.usage.get(identifier).cloned().unwrap_or_default()
    }

    fn append_usage(&mut self, identifier: &str, at: DateTime<Utc>) {
        let entries = self.usage.entry(identifier.to_string()).or_default();
        let position = entries.partition_point(|existing| *existing <= at);
        entries.insert(position, at);
    }

    fn prune_usage(&mut self, before: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.usage.retain(|_, entries| {
            let len = entries.len();
            entries.retain(|at| *at >= before);
            removed += len - entries.len();
            !entries.is_empty()
        });
        removed
    }

    fn record_usage(
        &mut self,
        identifier: &str,
        at: DateTime<Utc>,
        expire_before: DateTime<Utc>,
    ) -> usize {
        self.append_usage(identifier, at);
        self.prune_usage(expire_before)
    }

    fn record_key_use(&mut self, api_key: &str, fixes: usize, at: DateTime<Utc>) -> Result<()> {
        let record = self
            .keys
            .get_mut(api_key)
            .ok_or_else(|| Error::store(format!("unknown api key '{}'", redact(api_key))))?;
        record.total_fixes = record.total_fixes.saturating_add(fixes as u64);
        record.last_used = Some(at);
        Ok(())
    }

    fn record_analytics(&mut self, record: AnalyticsRecord) {
        self.analytics.push(record);
        if self.analytics.len() > MAX_ANALYTICS_RECORDS {
            let excess = self.analytics.len() - MAX_ANALYTICS_RECORDS;
            self.analytics.drain(..excess);
        }
    }
}

/// Keep enough of a key to recognise it in logs
pub(crate) fn redact(api_key: &str) -> String {
    let visible: String = api_key.chars().take(12).collect();
    format!("{visible}…")
}

/// In-process store
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<StoreDocument>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StoreDocument {
        self.document.lock().clone()
    }
}

impl AccessStore for MemoryStore {
    fn usage(&self, identifier: &str) -> Result<Vec<DateTime<Utc>>> {
        Ok(self.document.lock().usage(identifier))
    }

    fn record_usage(
        &self,
        identifier: &str,
        at: DateTime<Utc>,
        expire_before: DateTime<Utc>,
    ) -> Result<usize> {
        Ok(self
            .document
            .lock()
            .record_usage(identifier, at, expire_before))
    }

    fn key(&self, api_key: &str) -> Result<Option<KeyRecord>> {
        Ok(self.document.lock().keys.get(api_key).cloned())
    }

    fn insert_key(&self, record: KeyRecord) -> Result<()> {
        self.document
            .lock()
            .keys
            .insert(record.api_key.clone(), record);
        Ok(())
    }

    fn record_key_use(&self, api_key: &str, fixes: usize, at: DateTime<Utc>) -> Result<()> {
        self.document.lock().record_key_use(api_key, fixes, at)
    }

    fn record_analytics(&self, record: AnalyticsRecord) -> Result<()> {
        self.document.lock().record_analytics(record);
        Ok(())
    }

    fn analytics(&self) -> Result<Vec<AnalyticsRecord>> {
        Ok(self.document.lock().analytics.clone())
    }
}

/// Exclusive lock on the store's sidecar lock file, released on drop
struct StoreLockGuard {
    file: File,
}

impl Drop for StoreLockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

/// Single-document JSON store shared between processes
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_path: PathBuf,
    local: Mutex<()>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::file_system(parent, "create store directory", e))?;
        }

        let mut lock_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);

        let store = Self {
            path,
            lock_path,
            local: Mutex::new(()),
        };
        // Fail fast on a corrupt document
        store.read_document()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn acquire_lock(&self) -> Result<StoreLockGuard> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.lock_path)
            .map_err(|e| Error::file_system(&self.lock_path, "open lock file", e))?;

        let start = Instant::now();
        let mut backoff_ms = 5u64;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(StoreLockGuard { file }),
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    if start.elapsed() > LOCK_TIMEOUT {
                        return Err(Error::timeout("store lock", LOCK_TIMEOUT));
                    }
                    let jitter = rand::thread_rng().gen_range(0..=backoff_ms / 4);
                    std::thread::sleep(Duration::from_millis(backoff_ms + jitter));
                    backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
                }
                Err(e) => {
                    return Err(Error::file_system(&self.lock_path, "acquire exclusive lock", e))
                }
            }
        }
    }

    fn read_document(&self) -> Result<StoreDocument> {
        match read_optional(&self.path)? {
            None => Ok(StoreDocument::default()),
            Some(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(StoreDocument::default()),
            Some(bytes) => {
                let document: StoreDocument = serde_json::from_slice(&bytes).map_err(|e| {
                    Error::store(format!("corrupt store {}: {e}", self.path.display()))
                })?;
                if document.version != STORE_VERSION {
                    warn!(
                        path = %self.path.display(),
                        found = document.version,
                        expected = STORE_VERSION,
                        "store version mismatch"
                    );
                }
                Ok(document)
            }
        }
    }

    fn write_document(&self, document: &StoreDocument) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(document)?;
        write_atomic(&self.path, &bytes)
    }

    fn read<R>(&self, f: impl FnOnce(&StoreDocument) -> R) -> Result<R> {
        let _local = self.local.lock();
        let _lock = self.acquire_lock()?;
        let document = self.read_document()?;
        Ok(f(&document))
    }

    fn update<R>(&self, f: impl FnOnce(&mut StoreDocument) -> Result<R>) -> Result<R> {
        let _local = self.local.lock();
        let _lock = self.acquire_lock()?;
        let mut document = self.read_document()?;
        let result = f(&mut document)?;
        self.write_document(&document)?;
        debug!(path = %self.path.display(), "store updated");
        Ok(result)
    }
}

impl AccessStore for JsonFileStore {
    fn usage(&self, identifier: &str) -> Result<Vec<DateTime<Utc>>> {
        self.read(|doc| doc.usage(identifier))
    }

    fn record_usage(
        &self,
        identifier: &str,
        at: DateTime<Utc>,
        expire_before: DateTime<Utc>,
    ) -> Result<usize> {
        self.update(|doc| Ok(doc.record_usage(identifier, at, expire_before)))
    }

    fn key(&self, api_key: &str) -> Result<Option<KeyRecord>> {
        self.read(|doc| doc.keys.get(api_key).cloned())
    }

    fn insert_key(&self, record: KeyRecord) -> Result<()> {
        self.update(|doc| {
            doc.keys.insert(record.api_key.clone(), record);
            Ok(())
        })
    }

    fn record_key_use(&self, api_key: &str, fixes: usize, at: DateTime<Utc>) -> Result<()> {
        self.update(|doc| doc.record_key_use(api_key, fixes, at))
    }

    fn record_analytics(&self, record: AnalyticsRecord) -> Result<()> {
        self.update(|doc| {
            doc.record_analytics(record);
            Ok(())
        })
    }

    fn analytics(&self) -> Result<Vec<AnalyticsRecord>> {
        self.read(|doc| doc.analytics.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::Tier;
    use chrono::TimeZone;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn key_record(api_key: &str) -> KeyRecord {
        KeyRecord {
            api_key: api_key.to_string(),
            tier: Tier::Free,
            company: "Acme".to_string(),
            email: "dev@acme.test".to_string(),
            use_case: None,
            created_at: t(0),
            active: true,
            total_fixes: 0,
            last_used: None,
        }
    }

    fn exercise(store: &dyn AccessStore) {
        store.record_usage("10.0.0.1", t(20), t(0)).unwrap();
        store.record_usage("10.0.0.1", t(10), t(0)).unwrap();
        store.record_usage("10.0.0.2", t(5), t(0)).unwrap();
        assert_eq!(store.usage("10.0.0.1").unwrap(), vec![t(10), t(20)]);

        // Expiry applies to every identifier, not only the one recorded
        assert_eq!(store.record_usage("10.0.0.1", t(30), t(15)).unwrap(), 2);
        assert_eq!(store.usage("10.0.0.1").unwrap(), vec![t(20), t(30)]);
        assert!(store.usage("10.0.0.2").unwrap().is_empty());
        assert!(store.usage("unknown").unwrap().is_empty());

        store.insert_key(key_record("sfx_free_abc")).unwrap();
        store.record_key_use("sfx_free_abc", 7, t(40)).unwrap();
        let record = store.key("sfx_free_abc").unwrap().unwrap();
        assert_eq!(record.total_fixes, 7);
        assert_eq!(record.last_used, Some(t(40)));
        assert!(store.record_key_use("sfx_free_missing", 1, t(41)).is_err());
    }

    #[test]
    fn test_memory_store() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_json_store_persists_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state").join("store.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            exercise(&store);
        }

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.usage("10.0.0.1").unwrap(), vec![t(20), t(30)]);
        assert!(reopened.key("sfx_free_abc").unwrap().is_some());
        assert!(temp_dir.path().join("state").join("store.json.lock").exists());
    }

    #[test]
    fn test_json_store_rejects_corrupt_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(JsonFileStore::open(&path).is_err());

        fs::write(&path, "  \n").unwrap();
        assert!(JsonFileStore::open(&path).is_ok());
    }

    #[test]
    fn test_json_store_concurrent_appends_are_not_lost() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(JsonFileStore::open(temp_dir.path().join("store.json")).unwrap());

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for j in 0..5 {
                        store.record_usage("shared", t(i * 10 + j), t(-1)).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.usage("shared").unwrap().len(), 40);
    }

    #[test]
    fn test_expired_identifiers_leave_the_document() {
        let store = MemoryStore::new();
        for i in 0..100 {
            store.record_usage(&format!("10.0.0.{i}"), t(0), t(-86_400)).unwrap();
        }
        assert_eq!(store.snapshot().usage.len(), 100);

        store.record_usage("10.9.9.9", t(3 * 86_400), t(2 * 86_400)).unwrap();
        let document = store.snapshot();
        assert_eq!(document.usage.len(), 1);
        assert!(document.usage.contains_key("10.9.9.9"));
    }

    #[test]
    fn test_analytics_are_capped() {
        let mut document = StoreDocument::default();
        for i in 0..(MAX_ANALYTICS_RECORDS + 3) {
            document.record_analytics(AnalyticsRecord {
                identifier: format!("id-{i}"),
                tier: Tier::Demo,
                files_processed: 1,
                fixes_applied: 0,
                languages: vec![],
                elapsed_secs: 0.0,
                strategy: "sequential".into(),
                success_rate: 0.0,
                recorded_at: t(i as i64),
            });
        }
        assert_eq!(document.analytics.len(), MAX_ANALYTICS_RECORDS);
        assert_eq!(document.analytics[0].identifier, "id-3");
    }
}
