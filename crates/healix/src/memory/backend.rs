//! Persistence behind the memory store: a load/save contract plus two
//! implementations.

use super::proposal::Proposal;
use crate::result::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::warn;

/// Verified replacements keyed by locator signature
pub type CacheMap = HashMap<String, String>;

/// Wholesale load/save of the cache and the proposal ledger
pub trait MemoryBackend: Send + Sync + fmt::Debug {
    /// Read the whole cache
    fn load_cache(&self) -> Result<CacheMap, StorageError>;

    /// Replace the whole cache
    fn save_cache(&self, cache: &CacheMap) -> Result<(), StorageError>;

    /// Read the whole ledger
    fn load_ledger(&self) -> Result<Vec<Proposal>, StorageError>;

    /// Replace the whole ledger
    fn save_ledger(&self, ledger: &[Proposal]) -> Result<(), StorageError>;
}

/// JSON files on disk
///
/// The cache is a flat object of signature to replacement; the ledger is an
/// array of proposals. Writes go to a sibling temp file and are renamed into
/// place so a crash never leaves a half-written file. A file that does not
/// parse is moved aside to `<name>.corrupt` on load.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    cache_path: PathBuf,
    ledger_path: PathBuf,
}

impl JsonFileBackend {
    /// Backend over the given files (created on first write)
    #[must_use]
    pub fn new(cache_path: impl Into<PathBuf>, ledger_path: impl Into<PathBuf>) -> Self {
        Self {
            cache_path: cache_path.into(),
            ledger_path: ledger_path.into(),
        }
    }

    /// Cache file location
    #[must_use]
    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Ledger file location
    #[must_use]
    pub fn ledger_path(&self) -> &Path {
        &self.ledger_path
    }
}

impl MemoryBackend for JsonFileBackend {
    fn load_cache(&self) -> Result<CacheMap, StorageError> {
        read_json(&self.cache_path)
    }

    fn save_cache(&self, cache: &CacheMap) -> Result<(), StorageError> {
        // sorted keys keep the file diff-friendly
        let sorted: BTreeMap<&String, &String> = cache.iter().collect();
        write_json(&self.cache_path, &sorted)
    }

    fn load_ledger(&self) -> Result<Vec<Proposal>, StorageError> {
        read_json(&self.ledger_path)
    }

    fn save_ledger(&self, ledger: &[Proposal]) -> Result<(), StorageError> {
        write_json(&self.ledger_path, &ledger)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T, StorageError> {
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    if content.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&content).map_err(|source| {
        quarantine(path);
        StorageError::Corrupted {
            path: path.display().to_string(),
            source,
        }
    })
}

/// Sibling path holding an unparseable file
#[must_use]
pub fn corrupt_path(path: &Path) -> PathBuf {
    let mut aside = path.as_os_str().to_owned();
    aside.push(".corrupt");
    PathBuf::from(aside)
}

fn quarantine(path: &Path) {
    let aside = corrupt_path(path);
    match fs::rename(path, &aside) {
        Ok(()) => warn!(
            from = %path.display(),
            to = %aside.display(),
            "moved unreadable file aside"
        ),
        Err(e) => warn!(
            path = %path.display(),
            error = %e,
            "could not move unreadable file aside"
        ),
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let json = serde_json::to_string_pretty(value).map_err(|source| StorageError::Corrupted {
        path: path.display().to_string(),
        source,
    })?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, json).map_err(|e| io_error(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| io_error(path, e))
}

#[derive(Debug, Default)]
struct InMemoryState {
    cache: CacheMap,
    ledger: Vec<Proposal>,
    fail_reads: bool,
    fail_writes: bool,
    cache_saves: usize,
    ledger_saves: usize,
}

/// Process-local backend for tests
///
/// Clones share state, so a second store opened over a clone behaves like a
/// process restart against the same files.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryBackend {
    /// Empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-seeded with cache entries
    #[must_use]
    pub fn with_cache<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let backend = Self::new();
        backend.lock().cache = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        backend
    }

    /// Make every load fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Make every save fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Successful cache saves so far
    #[must_use]
    pub fn cache_saves(&self) -> usize {
        self.lock().cache_saves
    }

    /// Successful ledger saves so far
    #[must_use]
    pub fn ledger_saves(&self) -> usize {
        self.lock().ledger_saves
    }

    /// Persisted cache contents
    #[must_use]
    pub fn persisted_cache(&self) -> CacheMap {
        self.lock().cache.clone()
    }

    /// Persisted ledger contents
    #[must_use]
    pub fn persisted_ledger(&self) -> Vec<Proposal> {
        self.lock().ledger.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InMemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl MemoryBackend for InMemoryBackend {
    fn load_cache(&self) -> Result<CacheMap, StorageError> {
        let state = self.lock();
        if state.fail_reads {
            return Err(StorageError::unavailable("cache unreadable"));
        }
        Ok(state.cache.clone())
    }

    fn save_cache(&self, cache: &CacheMap) -> Result<(), StorageError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(StorageError::unavailable("cache unwritable"));
        }
        state.cache = cache.clone();
        state.cache_saves += 1;
        Ok(())
    }

    fn load_ledger(&self) -> Result<Vec<Proposal>, StorageError> {
        let state = self.lock();
        if state.fail_reads {
            return Err(StorageError::unavailable("ledger unreadable"));
        }
        Ok(state.ledger.clone())
    }

    fn save_ledger(&self, ledger: &[Proposal]) -> Result<(), StorageError> {
        let mut state = self.lock();
        if state.fail_writes {
            return Err(StorageError::unavailable("ledger unwritable"));
        }
        state.ledger = ledger.to_vec();
        state.ledger_saves += 1;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::provenance::SourceLocation;

    fn file_backend(dir: &tempfile::TempDir) -> JsonFileBackend {
        JsonFileBackend::new(
            dir.path().join("cache.json"),
            dir.path().join("proposals.json"),
        )
    }

    #[test]
    fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = file_backend(&dir);
        assert!(backend.load_cache().unwrap().is_empty());
        assert!(backend.load_ledger().unwrap().is_empty());
    }

    #[test]
    fn test_cache_file_is_flat_json_object() {
        let dir = tempfile::tempdir().unwrap();
        let backend = file_backend(&dir);
        let mut cache = CacheMap::new();
        cache.insert("#old-id".to_string(), "#new-id".to_string());
        backend.save_cache(&cache).unwrap();

        let raw = fs::read_to_string(backend.cache_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({"#old-id": "#new-id"}));
        assert!(!dir.path().join("cache.json.tmp").exists());
    }

    #[test]
    fn test_ledger_file_is_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let backend = file_backend(&dir);
        let proposal = Proposal::new(SourceLocation::new("t.rs", 9), "#a", "#b");
        backend.save_ledger(&[proposal.clone()]).unwrap();

        let raw = fs::read_to_string(backend.ledger_path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.is_array());
        assert_eq!(backend.load_ledger().unwrap(), vec![proposal]);
    }

    #[test]
    fn test_corrupted_cache_reported() {
        let dir = tempfile::tempdir().unwrap();
        let backend = file_backend(&dir);
        fs::write(backend.cache_path(), "{not json").unwrap();
        assert!(matches!(
            backend.load_cache(),
            Err(StorageError::Corrupted { .. })
        ));
        assert!(!backend.cache_path().exists());
        let aside = corrupt_path(backend.cache_path());
        assert_eq!(fs::read_to_string(aside).unwrap(), "{not json");
    }

    #[test]
    fn test_blank_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let backend = file_backend(&dir);
        fs::write(backend.cache_path(), "  \n").unwrap();
        assert!(backend.load_cache().unwrap().is_empty());
    }

    #[test]
    fn test_save_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let backend = JsonFileBackend::new(
            dir.path().join("nested/deeper/cache.json"),
            dir.path().join("nested/ledger.json"),
        );
        backend.save_cache(&CacheMap::new()).unwrap();
        assert!(backend.cache_path().exists());
    }

    #[test]
    fn test_in_memory_clones_share_state() {
        let backend = InMemoryBackend::new();
        let other = backend.clone();
        let mut cache = CacheMap::new();
        cache.insert("a".into(), "b".into());
        backend.save_cache(&cache).unwrap();
        assert_eq!(other.load_cache().unwrap(), cache);
        assert_eq!(other.cache_saves(), 1);
    }

    #[test]
    fn test_in_memory_failure_injection() {
        let backend = InMemoryBackend::new();
        backend.set_fail_writes(true);
        assert!(backend.save_cache(&CacheMap::new()).is_err());
        backend.set_fail_reads(true);
        assert!(backend.load_ledger().is_err());
    }
}
