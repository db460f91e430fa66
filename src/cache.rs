//! Fingerprinted, TTL-bounded, on-disk cache with at-most-once concurrent
//! build per key (§4.6).
//!
//! Grounded on the teacher's own cache-path hashing scheme
//! (`default_db_path` hashed the canonical root with SHA-256 into a file
//! name under a per-user cache directory); this module generalizes that
//! one-shot hash into a keyed, TTL-checked, atomically-written store.

use crate::error::{CacheError, Result};
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;

const CACHE_VERSION: u32 = 1;
const DEFAULT_EVICTION_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// On-disk cache entry envelope. Readers reject entries whose `version`
/// does not match [`CACHE_VERSION`].
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CacheEnvelope<T> {
    version: u32,
    created_at: i64,
    ttl_seconds: u64,
    key_fingerprint: String,
    payload: T,
}

/// One fingerprint's worth of inputs, stable-hashed into a cache key.
///
/// Covers everything §4.6 names: source set, normalized filter, lookback
/// window, limit, fast-mode flag, project root, and per-source-store
/// `(path, size, mtime_ns)` tuples.
#[derive(Debug, Default)]
pub struct FingerprintInput {
    parts: Vec<String>,
}

impl FingerprintInput {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, name: &str, value: impl std::fmt::Display) -> Self {
        self.parts.push(format!("{name}={value}"));
        self
    }

    #[must_use]
    pub fn store_stat(mut self, path: &Path) -> Self {
        if let Ok(meta) = std::fs::metadata(path) {
            let mtime_ns = meta
                .modified()
                .ok()
                .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
                .map_or(0, |d| d.as_nanos());
            self.parts.push(format!(
                "store:{}:{}:{}",
                path.display(),
                meta.len(),
                mtime_ns
            ));
        } else {
            self.parts.push(format!("store:{}:absent", path.display()));
        }
        self
    }

    /// Hashes the accumulated fields into a stable hex fingerprint.
    #[must_use]
    pub fn finish(mut self) -> String {
        self.parts.sort();
        let mut hasher = Sha256::new();
        for part in &self.parts {
            hasher.update(part.as_bytes());
            hasher.update(b"\0");
        }
        let digest = hasher.finalize();
        digest.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// On-disk, TTL-bounded, at-most-once-build cache.
pub struct Cache {
    dir: PathBuf,
    default_ttl: Duration,
    build_locks: Mutex<HashMap<String, Arc<Notify>>>,
}

impl Cache {
    #[must_use]
    pub fn new(dir: PathBuf, default_ttl: Duration) -> Self {
        Self { dir, default_ttl, build_locks: Mutex::new(HashMap::new()) }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }

    fn lock_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.lock"))
    }

    /// Reads a cache entry if present and not expired. A missing file, an
    /// expired entry, or a corrupt/unknown-version entry are all treated
    /// as a miss (`Ok(None)`), per §4.6 and §7's "cache read errors
    /// degrade to miss" policy.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.entry_path(key);
        let contents = std::fs::read_to_string(&path).ok()?;
        let envelope: CacheEnvelope<T> = serde_json::from_str(&contents).ok()?;

        if envelope.version != CACHE_VERSION {
            return None;
        }

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);
        let age_seconds = (now - envelope.created_at).max(0) / 1000;
        if age_seconds as u64 > envelope.ttl_seconds {
            return None;
        }

        Some(envelope.payload)
    }

    /// Writes a cache entry atomically (temp file + rename).
    pub fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let ttl = ttl.unwrap_or(self.default_ttl);
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0);

        let envelope = CacheEnvelope {
            version: CACHE_VERSION,
            created_at,
            ttl_seconds: ttl.as_secs(),
            key_fingerprint: key.to_string(),
            payload: value,
        };

        let path = self.entry_path(key);
        let tmp_path = self.dir.join(format!("{key}.tmp-{}", std::process::id()));
        let serialized = serde_json::to_string(&envelope)
            .map_err(crate::error::GandalfError::Json)?;

        std::fs::write(&tmp_path, serialized).map_err(|e| CacheError::Write {
            path: tmp_path.clone(),
            source: e,
        })?;
        std::fs::rename(&tmp_path, &path).map_err(|e| CacheError::Write { path: path.clone(), source: e })?;

        Ok(())
    }

    /// Runs `build` at most once per key across concurrent callers within
    /// this process, reading from cache first and writing the result back
    /// on a miss. A best-effort filesystem lock file additionally
    /// coordinates across processes; a lock older than 2×TTL is treated
    /// as stale and reclaimed.
    pub async fn get_or_build<T, F, Fut>(&self, key: &str, ttl: Option<Duration>, build: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        if let Some(hit) = self.get::<T>(key) {
            return Ok(hit);
        }

        let notify = {
            let mut locks = self.build_locks.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(existing) = locks.get(key) {
                Some(Arc::clone(existing))
            } else {
                let fresh = Arc::new(Notify::new());
                locks.insert(key.to_string(), Arc::clone(&fresh));
                None
            }
        };

        if let Some(existing) = notify {
            // Another in-process caller is already building this key.
            existing.notified().await;
            if let Some(hit) = self.get::<T>(key) {
                return Ok(hit);
            }
            // The builder failed without writing a cache entry; fall through
            // and race again rather than returning a phantom value.
        }

        self.acquire_filesystem_lock(key, ttl.unwrap_or(self.default_ttl));
        let result = build().await;
        self.release_filesystem_lock(key);

        if let Ok(ref value) = result {
            if let Err(e) = self.put(key, value, ttl) {
                tracing::warn!(key, error = %e, "cache write failed, continuing with uncached result");
            }
        }

        if let Some(notify) = self.build_locks.lock().unwrap_or_else(|e| e.into_inner()).remove(key) {
            notify.notify_waiters();
        }

        result
    }

    fn acquire_filesystem_lock(&self, key: &str, ttl: Duration) {
        let _ = std::fs::create_dir_all(&self.dir);
        let lock_path = self.lock_path(key);
        if let Ok(meta) = std::fs::metadata(&lock_path) {
            let stale_after = ttl.saturating_mul(2);
            if meta
                .modified()
                .ok()
                .and_then(|m| m.elapsed().ok())
                .is_some_and(|age| age > stale_after)
            {
                let _ = std::fs::remove_file(&lock_path);
            }
        }
        let _ = std::fs::write(&lock_path, std::process::id().to_string());
    }

    fn release_filesystem_lock(&self, key: &str) {
        let _ = std::fs::remove_file(self.lock_path(key));
    }

    /// Opportunistic eviction: removes entries whose age exceeds 2×TTL
    /// once the cache directory's total size exceeds `size_cap_bytes`.
    pub fn evict_if_over_budget(&self, size_cap_bytes: Option<u64>) {
        let cap = size_cap_bytes.unwrap_or(DEFAULT_EVICTION_SIZE_BYTES);
        let Ok(entries) = std::fs::read_dir(&self.dir) else { return };

        let mut files: Vec<(PathBuf, u64, SystemTime)> = Vec::new();
        let mut total = 0u64;
        for entry in entries.flatten() {
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(".lock") || name.contains(".tmp-") {
                continue;
            }
            total += meta.len();
            let modified = meta.modified().unwrap_or(UNIX_EPOCH);
            files.push((entry.path(), meta.len(), modified));
        }

        if total <= cap {
            return;
        }

        for (path, _, modified) in files {
            let age = modified.elapsed().unwrap_or_default();
            if age > self.default_ttl.saturating_mul(2) {
                let _ = std::fs::remove_file(&path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_regardless_of_field_order() {
        let a = FingerprintInput::new().field("limit", 10).field("days", 7).finish();
        let b = FingerprintInput::new().field("days", 7).field("limit", 10).finish();
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_different_inputs() {
        let a = FingerprintInput::new().field("limit", 10).finish();
        let b = FingerprintInput::new().field("limit", 11).finish();
        assert_ne!(a, b);
    }

    #[test]
    fn put_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        cache.put("k1", &vec![1, 2, 3], None).unwrap();
        let got: Option<Vec<i32>> = cache.get("k1");
        assert_eq!(got, Some(vec![1, 2, 3]));
    }

    #[test]
    fn expired_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), Duration::from_secs(0));
        cache.put("k1", &42i32, Some(Duration::from_secs(0))).unwrap();
        std::thread::sleep(Duration::from_millis(1100));
        let got: Option<i32> = cache.get("k1");
        assert_eq!(got, None);
    }

    #[test]
    fn missing_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        let got: Option<i32> = cache.get("nope");
        assert_eq!(got, None);
    }

    #[test]
    fn corrupt_entry_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bad"), "not json").unwrap();
        let cache = Cache::new(dir.path().to_path_buf(), Duration::from_secs(3600));
        let got: Option<i32> = cache.get("bad");
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn get_or_build_runs_once_per_key() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(Cache::new(dir.path().to_path_buf(), Duration::from_secs(3600)));
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_build("same-key", None, || async {
                        calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(7i32)
                    })
                    .await
            }));
        }

        for h in handles {
            assert_eq!(h.await.unwrap().unwrap(), 7);
        }
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
