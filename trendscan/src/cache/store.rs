//! Durable key-value store with whole-snapshot persistence.
//!
//! The persisted form is a single JSON document mapping hex keys to arbitrary
//! JSON values. Every operation loads the full snapshot; writes replace the
//! file atomically (temp file + rename), so a reader never observes a
//! half-written snapshot and a crash mid-write leaves the previous one
//! intact.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use super::key::CacheKey;
use crate::errors::CacheError;

type Snapshot = HashMap<String, Value>;

/// Protocol for the cache storage backend.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Gets an entry; absence is `None`, never an error.
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError>;

    /// Sets or overwrites an entry. Whole-value replacement, no merging.
    async fn put(&self, key: &CacheKey, value: Value) -> Result<(), CacheError>;

    /// Removes every entry and the persisted snapshot itself.
    async fn clear(&self) -> Result<(), CacheError>;
}

/// File-backed cache store.
///
/// Single-process, single-writer semantics: the load-modify-persist cycle is
/// serialized by one process-wide lock, so two concurrent `put`s cannot lose
/// each other's entries.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
    load_failures: AtomicU64,
}

impl JsonFileStore {
    /// Creates a store backed by the given file path. The file is created
    /// lazily on the first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
            load_failures: AtomicU64::new(0),
        }
    }

    /// The snapshot file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times an unreadable snapshot was degraded to an empty one.
    ///
    /// Degradation keeps memoization alive through a corrupt file but
    /// discards prior contents; this counter makes that loss observable.
    #[must_use]
    pub fn load_failures(&self) -> u64 {
        self.load_failures.load(Ordering::Relaxed)
    }

    fn load_all(&self) -> Snapshot {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Snapshot::new(),
            Err(err) => {
                self.record_load_failure(&err.to_string());
                return Snapshot::new();
            }
        };
        match serde_json::from_str(&text) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.record_load_failure(&err.to_string());
                Snapshot::new()
            }
        }
    }

    fn record_load_failure(&self, reason: &str) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
        let err = CacheError::unreadable(self.path.display().to_string(), reason);
        tracing::warn!(error = %err, "treating cache store as empty");
    }

    fn save_all(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|err| CacheError::serialize(err.to_string()))?;

        // Write beside the canonical file, then rename over it.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|err| CacheError::write(tmp.display().to_string(), err.to_string()))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|err| CacheError::write(self.path.display().to_string(), err.to_string()))
    }
}

#[async_trait]
impl CacheStore for JsonFileStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError> {
        let _guard = self.write_lock.lock();
        Ok(self.load_all().get(key.as_str()).cloned())
    }

    async fn put(&self, key: &CacheKey, value: Value) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock();
        let mut snapshot = self.load_all();
        snapshot.insert(key.as_str().to_string(), value);
        self.save_all(&snapshot)
    }

    async fn clear(&self) -> Result<(), CacheError> {
        let _guard = self.write_lock.lock();
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(CacheError::write(
                self.path.display().to_string(),
                err.to_string(),
            )),
        }
    }
}

/// In-memory cache store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: Mutex<Snapshot>,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[async_trait]
impl CacheStore for InMemoryStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>, CacheError> {
        Ok(self.entries.lock().get(key.as_str()).cloned())
    }

    async fn put(&self, key: &CacheKey, value: Value) -> Result<(), CacheError> {
        self.entries.lock().insert(key.as_str().to_string(), value);
        Ok(())
    }

    async fn clear(&self) -> Result<(), CacheError> {
        self.entries.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::derive_key;
    use serde_json::json;

    fn key(tag: &str) -> CacheKey {
        derive_key(tag, "Energy Drinks", "2025-01-01", "2025-01-31")
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("cache.json"));

        let k = key("generate_query");
        assert_eq!(store.get(&k).await.unwrap(), None);

        store.put(&k, json!({"search_query": "top drinks"})).await.unwrap();
        assert_eq!(
            store.get(&k).await.unwrap(),
            Some(json!({"search_query": "top drinks"}))
        );
    }

    #[tokio::test]
    async fn test_file_store_overwrite_not_merge() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("cache.json"));
        let k = key("web_search");

        store.put(&k, json!({"a": 1, "b": 2})).await.unwrap();
        store.put(&k, json!({"c": 3})).await.unwrap();

        assert_eq!(store.get(&k).await.unwrap(), Some(json!({"c": 3})));
    }

    #[tokio::test]
    async fn test_file_store_no_temp_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let store = JsonFileStore::new(&path);

        store.put(&key("x"), json!(1)).await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("cache.json")]);
    }

    #[tokio::test]
    async fn test_file_store_corrupt_snapshot_degrades_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "{not valid json").unwrap();

        let store = JsonFileStore::new(&path);
        assert_eq!(store.get(&key("x")).await.unwrap(), None);
        assert_eq!(store.load_failures(), 1);

        // A write rebuilds the store from empty.
        store.put(&key("x"), json!("fresh")).await.unwrap();
        assert_eq!(store.get(&key("x")).await.unwrap(), Some(json!("fresh")));
    }

    #[tokio::test]
    async fn test_file_store_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let store = JsonFileStore::new(&path);

        store.put(&key("x"), json!(1)).await.unwrap();
        assert!(path.exists());

        store.clear().await.unwrap();
        assert!(!path.exists());
        assert_eq!(store.get(&key("x")).await.unwrap(), None);

        // Clearing an already-absent store is fine.
        store.clear().await.unwrap();

        store.put(&key("y"), json!(2)).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_file_store_distinct_keys_coexist() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("cache.json"));

        store.put(&key("a"), json!(1)).await.unwrap();
        store.put(&key("b"), json!(2)).await.unwrap();

        assert_eq!(store.get(&key("a")).await.unwrap(), Some(json!(1)));
        assert_eq!(store.get(&key("b")).await.unwrap(), Some(json!(2)));
    }

    #[tokio::test]
    async fn test_in_memory_store_basic() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());

        store.put(&key("a"), json!("v1")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&key("a")).await.unwrap(), Some(json!("v1")));

        store.put(&key("a"), json!("v2")).await.unwrap();
        assert_eq!(store.get(&key("a")).await.unwrap(), Some(json!("v2")));

        store.clear().await.unwrap();
        assert!(store.is_empty());
    }
}
