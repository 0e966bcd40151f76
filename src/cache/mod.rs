//! Content-addressable on-disk cache for search indexes.
//!
//! Entries are keyed by [`Fingerprint`] and written with atomic
//! replace-on-write, so a reader never observes a partial entry even when
//! several processes share the cache directory. An unreadable entry is
//! treated as a miss and dropped, never surfaced as an error. Total size is
//! held under a configured byte budget by evicting least-recently-used
//! entries after each insert.

use crate::error::{Result, SvarError};
use crate::index::{Fingerprint, SearchIndex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as BuildMutex;
use tracing::{debug, info, instrument, warn};

/// Evict down to this share of the budget, so a single insert does not
/// immediately re-trigger eviction.
const EVICTION_TARGET_RATIO: f64 = 0.8;

/// Sidecar metadata stored next to each serialized index.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    video_id: String,
    created_at: DateTime<Utc>,
    last_access: DateTime<Utc>,
}

/// Per-entry information exposed for cache inspection.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    pub fingerprint: String,
    pub video_id: String,
    pub size_bytes: u64,
    pub last_access: DateTime<Utc>,
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub total_bytes: u64,
    pub max_bytes: u64,
    pub entry_count: usize,
    pub entries: Vec<CacheEntryInfo>,
}

/// On-disk cache of built search indexes.
pub struct CacheStore {
    dir: PathBuf,
    max_bytes: u64,
    // One async lock per fingerprint so concurrent requests for the same
    // uncached index coordinate on a single build. The outer map lock is
    // held only to look up or insert an entry, never across an await, so
    // unrelated fingerprints do not contend.
    build_locks: Mutex<HashMap<String, Arc<BuildMutex<()>>>>,
}

impl CacheStore {
    /// Open (or create) a cache directory with the given size budget.
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        info!("Cache store at {:?} (budget {} bytes)", dir, max_bytes);
        Ok(Self {
            dir,
            max_bytes,
            build_locks: Mutex::new(HashMap::new()),
        })
    }

    fn entry_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.index.json", fingerprint))
    }

    fn meta_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{}.meta.json", fingerprint))
    }

    /// Look up a cached index, refreshing its last-access time on a hit.
    ///
    /// A corrupt entry is dropped and reported as a miss; it will be
    /// rebuilt on the next request.
    #[instrument(skip(self), fields(fingerprint = %fingerprint))]
    pub fn get(&self, fingerprint: &Fingerprint) -> Result<Option<SearchIndex>> {
        let path = self.entry_path(fingerprint);
        if !path.exists() {
            return Ok(None);
        }

        match self.read_entry(&path) {
            Ok(index) => {
                self.touch(fingerprint);
                debug!("Cache hit");
                Ok(Some(index))
            }
            Err(e) => {
                warn!("Dropping unreadable cache entry {}: {}", fingerprint, e);
                self.remove_entry(fingerprint)?;
                Ok(None)
            }
        }
    }

    fn read_entry(&self, path: &Path) -> std::result::Result<SearchIndex, SvarError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| SvarError::CacheCorruption(format!("{:?}: {}", path, e)))
    }

    /// Store a built index, then evict if the budget is exceeded.
    ///
    /// The entry is written to a temporary file in the cache directory and
    /// renamed into place, so concurrent readers see either the old entry
    /// or the new one, never a partial write.
    #[instrument(skip(self, index), fields(fingerprint = %fingerprint))]
    pub fn put(&self, fingerprint: &Fingerprint, index: &SearchIndex, video_id: &str) -> Result<()> {
        let body = serde_json::to_vec(index)?;
        self.write_atomic(&self.entry_path(fingerprint), &body)?;

        let now = Utc::now();
        let meta = EntryMeta {
            video_id: video_id.to_string(),
            created_at: now,
            last_access: now,
        };
        self.write_atomic(&self.meta_path(fingerprint), &serde_json::to_vec(&meta)?)?;

        debug!("Cached {} bytes", body.len());
        self.evict_if_needed()?;
        Ok(())
    }

    fn write_atomic(&self, path: &Path, body: &[u8]) -> Result<()> {
        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        std::fs::write(tmp.path(), body)?;
        tmp.persist(path)
            .map_err(|e| SvarError::Io(e.error))?;
        Ok(())
    }

    /// Update an entry's last-access time. Best-effort: a failure here only
    /// weakens LRU ordering, so it is logged and ignored.
    fn touch(&self, fingerprint: &Fingerprint) {
        let path = self.meta_path(fingerprint);
        let meta = std::fs::read_to_string(&path)
            .ok()
            .and_then(|c| serde_json::from_str::<EntryMeta>(&c).ok());

        if let Some(mut meta) = meta {
            meta.last_access = Utc::now();
            if let Ok(body) = serde_json::to_vec(&meta) {
                if let Err(e) = self.write_atomic(&path, &body) {
                    warn!("Failed to update access time for {}: {}", fingerprint, e);
                }
            }
        }
    }

    /// Get the cached index for `fingerprint`, building and storing it on a
    /// miss. Concurrent callers with the same fingerprint coordinate so the
    /// build runs at most once; the others wait for its result or failure.
    pub async fn get_or_build<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        video_id: &str,
        build: F,
    ) -> Result<Arc<SearchIndex>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SearchIndex>>,
    {
        if let Some(index) = self.get(fingerprint)? {
            return Ok(Arc::new(index));
        }

        let lock = {
            let mut locks = self.build_locks.lock().expect("build lock map poisoned");
            locks
                .entry(fingerprint.as_str().to_string())
                .or_default()
                .clone()
        };
        let _guard = lock.lock().await;

        // Another caller may have finished the build while we waited.
        if let Some(index) = self.get(fingerprint)? {
            return Ok(Arc::new(index));
        }

        info!("Cache miss for {}, building index", fingerprint);
        let index = build().await?;
        self.put(fingerprint, &index, video_id)?;
        Ok(Arc::new(index))
    }

    /// Remove least-recently-used entries until the cache fits its budget.
    /// Returns the number of entries removed.
    pub fn evict_if_needed(&self) -> Result<usize> {
        let mut entries = self.list_entries()?;
        let mut total: u64 = entries.iter().map(|e| e.size_bytes).sum();
        if total <= self.max_bytes {
            return Ok(0);
        }

        let target = (self.max_bytes as f64 * EVICTION_TARGET_RATIO) as u64;
        entries.sort_by(|a, b| {
            a.last_access
                .cmp(&b.last_access)
                .then_with(|| a.fingerprint.cmp(&b.fingerprint))
        });

        let mut removed = 0;
        for entry in entries {
            if total <= target {
                break;
            }
            let fp = Fingerprint::from_hex(&entry.fingerprint);
            self.remove_entry(&fp)?;
            total = total.saturating_sub(entry.size_bytes);
            removed += 1;
            info!(
                "Evicted cache entry {} ({} bytes, last used {})",
                entry.fingerprint, entry.size_bytes, entry.last_access
            );
        }

        Ok(removed)
    }

    /// Cache statistics for display and manual management.
    pub fn stats(&self) -> Result<CacheStats> {
        let entries = self.list_entries()?;
        Ok(CacheStats {
            total_bytes: entries.iter().map(|e| e.size_bytes).sum(),
            max_bytes: self.max_bytes,
            entry_count: entries.len(),
            entries,
        })
    }

    /// Remove every cache entry. Returns the number of entries removed.
    pub fn clear(&self) -> Result<usize> {
        let entries = self.list_entries()?;
        let count = entries.len();
        for entry in &entries {
            self.remove_entry(&Fingerprint::from_hex(&entry.fingerprint))?;
        }
        Ok(count)
    }

    fn remove_entry(&self, fingerprint: &Fingerprint) -> Result<()> {
        for path in [self.entry_path(fingerprint), self.meta_path(fingerprint)] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn list_entries(&self) -> Result<Vec<CacheEntryInfo>> {
        let mut entries = Vec::new();

        for dirent in std::fs::read_dir(&self.dir)? {
            let dirent = dirent?;
            let name = dirent.file_name().to_string_lossy().to_string();
            let Some(fingerprint) = name.strip_suffix(".index.json") else {
                continue;
            };

            let fp = Fingerprint::from_hex(fingerprint);
            let index_size = dirent.metadata()?.len();
            let meta_path = self.meta_path(&fp);
            let meta_size = std::fs::metadata(&meta_path).map(|m| m.len()).unwrap_or(0);

            let meta = std::fs::read_to_string(&meta_path)
                .ok()
                .and_then(|c| serde_json::from_str::<EntryMeta>(&c).ok());

            let (video_id, last_access) = match meta {
                Some(m) => (m.video_id, m.last_access),
                // Missing or unreadable sidecar: fall back to file mtime so
                // the entry still participates in LRU ordering.
                None => {
                    let mtime = dirent
                        .metadata()?
                        .modified()
                        .map(DateTime::<Utc>::from)
                        .unwrap_or_else(|_| Utc::now());
                    (String::new(), mtime)
                }
            };

            entries.push(CacheEntryInfo {
                fingerprint: fingerprint.to_string(),
                video_id,
                size_bytes: index_size + meta_size,
                last_access,
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample_index(fingerprint: &Fingerprint) -> SearchIndex {
        serde_json::from_value(serde_json::json!({
            "fingerprint": fingerprint.as_str(),
            "dimensions": 3,
            "chunks": {
                "segments": [
                    { "index": 0, "start": 0, "end": 11, "text": "hello world" }
                ],
                "params": { "chunk_size": 40, "overlap": 10 }
            },
            "embeddings": [[1.0, 0.0, 0.0]]
        }))
        .unwrap()
    }

    fn fp(tag: &str) -> Fingerprint {
        Fingerprint::from_hex(tag)
    }

    #[test]
    fn test_put_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::new(dir.path(), 10_000_000).unwrap();

        let key = fp("aa11");
        assert!(cache.get(&key).unwrap().is_none());

        cache.put(&key, &sample_index(&key), "video1").unwrap();
        let loaded = cache.get(&key).unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.fingerprint().as_str(), "aa11");
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::new(dir.path(), 10_000_000).unwrap();

        let key = fp("bb22");
        cache.put(&key, &sample_index(&key), "video1").unwrap();
        std::fs::write(dir.path().join("bb22.index.json"), b"{ not json").unwrap();

        assert!(cache.get(&key).unwrap().is_none());
        // The broken files are gone; a rebuild can repopulate the slot.
        assert!(!dir.path().join("bb22.index.json").exists());
    }

    #[test]
    fn test_eviction_is_lru_and_respects_budget() {
        let dir = TempDir::new().unwrap();

        // Measure the on-disk footprint of one entry first.
        let probe = CacheStore::new(dir.path().join("probe"), u64::MAX).unwrap();
        let key = fp("cc33");
        probe.put(&key, &sample_index(&key), "v").unwrap();
        let entry_size = probe.stats().unwrap().total_bytes;

        let cache = CacheStore::new(dir.path().join("real"), entry_size * 2 + entry_size / 2).unwrap();
        let (a, b, c) = (fp("0a"), fp("0b"), fp("0c"));

        cache.put(&a, &sample_index(&a), "va").unwrap();
        std::thread::sleep(Duration::from_millis(5));
        cache.put(&b, &sample_index(&b), "vb").unwrap();
        std::thread::sleep(Duration::from_millis(5));
        // Touch `a` so `b` becomes least recently used.
        assert!(cache.get(&a).unwrap().is_some());
        std::thread::sleep(Duration::from_millis(5));
        cache.put(&c, &sample_index(&c), "vc").unwrap();

        assert!(cache.get(&b).unwrap().is_none(), "LRU entry should be evicted");
        assert!(cache.get(&a).unwrap().is_some());
        assert!(cache.get(&c).unwrap().is_some());

        let stats = cache.stats().unwrap();
        assert!(stats.total_bytes <= stats.max_bytes);
        assert_eq!(stats.entry_count, 2);
    }

    #[test]
    fn test_stats_and_clear() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::new(dir.path(), 10_000_000).unwrap();

        let key = fp("dd44");
        cache.put(&key, &sample_index(&key), "video1").unwrap();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.entry_count, 1);
        assert!(stats.total_bytes > 0);
        assert_eq!(stats.entries[0].video_id, "video1");

        assert_eq!(cache.clear().unwrap(), 1);
        assert_eq!(cache.stats().unwrap().entry_count, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_builds_run_once() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(CacheStore::new(dir.path(), 10_000_000).unwrap());
        let builds = Arc::new(AtomicUsize::new(0));
        let key = fp("ee55");

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let builds = builds.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_build(&key, "video1", || async {
                        builds.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok(sample_index(&key))
                    })
                    .await
            }));
        }

        for handle in handles {
            let index = handle.await.unwrap().unwrap();
            assert_eq!(index.len(), 1);
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_build_leaves_no_entry() {
        let dir = TempDir::new().unwrap();
        let cache = CacheStore::new(dir.path(), 10_000_000).unwrap();
        let key = fp("ff66");

        let result = cache
            .get_or_build(&key, "video1", || async {
                Err(SvarError::EmbeddingQuota("rate limited".to_string()))
            })
            .await;
        assert!(result.is_err());
        assert!(cache.get(&key).unwrap().is_none());

        // A later call can still build successfully.
        let index = cache
            .get_or_build(&key, "video1", || async { Ok(sample_index(&key)) })
            .await
            .unwrap();
        assert_eq!(index.len(), 1);
    }
}
