//! Disk-backed attachment store with JSON metadata index and LRU eviction.

use std::{
    collections::HashMap,
    fs,
    hash::{Hash, Hasher},
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use media_platform::{CacheProbe, MediaError, MediaErrorCategory, MediaFileStore, MediaKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const MEDIA_CACHE_DIR: &str = "media-cache";
const INDEX_FILE: &str = "index.json";
pub const DEFAULT_CAPACITY_BYTES: u64 = 1_024 * 1_024 * 1_024;

/// File I/O runs on the blocking pool; the index lock is never held on a
/// runtime thread.
#[derive(Debug, Clone)]
pub struct DiskMediaStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    root: PathBuf,
    index_path: PathBuf,
    capacity_bytes: u64,
    index: Mutex<CacheIndex>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CacheIndex {
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    key: String,
    path: String,
    size: u64,
    last_access_ms: u64,
}

impl DiskMediaStore {
    pub fn new(data_dir: &Path) -> io::Result<Self> {
        Self::with_capacity(data_dir, DEFAULT_CAPACITY_BYTES)
    }

    pub fn with_capacity(data_dir: &Path, capacity_bytes: u64) -> io::Result<Self> {
        let root = data_dir.join(MEDIA_CACHE_DIR);
        fs::create_dir_all(&root)?;
        let index_path = root.join(INDEX_FILE);
        let mut index = load_index(&index_path).unwrap_or_default();
        index
            .entries
            .retain(|_, entry| root.join(&entry.path).exists());

        let inner = StoreInner {
            root,
            index_path,
            capacity_bytes: capacity_bytes.max(1),
            index: Mutex::new(index),
        };
        {
            let mut index = inner.lock();
            inner.evict_if_needed(&mut index, None)?;
            inner.persist_index(&index)?;
        }
        Ok(Self {
            inner: Arc::new(inner),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    async fn run_blocking<T, F>(&self, work: F) -> Result<T, MediaError>
    where
        T: Send + 'static,
        F: FnOnce(&StoreInner) -> Result<T, MediaError> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || work(inner.as_ref()))
            .await
            .map_err(|err| {
                MediaError::new(
                    MediaErrorCategory::Internal,
                    "media_store_task_failed",
                    err.to_string(),
                )
            })?
    }
}

impl StoreInner {
    fn target_path(&self, kind: MediaKind, mime_type: Option<&str>, url: &str) -> PathBuf {
        let ext = extension_from_mime(mime_type)
            .or_else(|| extension_from_url(url))
            .unwrap_or("bin");
        let file_name = format!("{:016x}.{ext}", stable_hash(&cache_key(kind, url)));
        self.root.join(kind.dir_name()).join(file_name)
    }

    fn search(
        &self,
        kind: MediaKind,
        mime_type: Option<&str>,
        url: &str,
    ) -> Result<CacheProbe, MediaError> {
        let key = cache_key(kind, url);
        let mut index = self.lock();

        if let Some(entry) = index.entries.get_mut(&key) {
            let path = self.root.join(&entry.path);
            if path.is_file() {
                entry.last_access_ms = now_millis();
                if let Err(err) = self.persist_index(&index) {
                    warn!(error = %err, "failed to persist media index");
                }
                return Ok(CacheProbe { exists: true, path });
            }
            index.entries.remove(&key);
        }
        drop(index);

        let path = self.target_path(kind, mime_type, url);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(MediaError::storage)?;
        }
        Ok(CacheProbe {
            exists: false,
            path,
        })
    }

    fn record(&self, kind: MediaKind, url: &str, path: &Path) -> Result<(), MediaError> {
        let size = fs::metadata(path).map_err(MediaError::storage)?.len();
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let key = cache_key(kind, url);

        let mut index = self.lock();
        index.entries.insert(
            key.clone(),
            CacheEntry {
                key: key.clone(),
                path: relative.to_string_lossy().to_string(),
                size,
                last_access_ms: now_millis(),
            },
        );
        self.evict_if_needed(&mut index, Some(&key))
            .map_err(MediaError::storage)?;
        self.persist_index(&index).map_err(MediaError::storage)
    }

    fn evict_if_needed(&self, index: &mut CacheIndex, protected_key: Option<&str>) -> io::Result<()> {
        while total_size_bytes(index) > self.capacity_bytes {
            let Some(evict_key) = index
                .entries
                .values()
                .filter(|entry| Some(entry.key.as_str()) != protected_key)
                .min_by_key(|entry| entry.last_access_ms)
                .map(|entry| entry.key.clone())
            else {
                break;
            };

            if let Some(entry) = index.entries.remove(&evict_key) {
                debug!(key = %entry.key, size = entry.size, "evicting cached attachment");
                match fs::remove_file(self.root.join(entry.path)) {
                    Ok(()) => {}
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                    Err(err) => return Err(err),
                }
            }
        }
        Ok(())
    }

    fn persist_index(&self, index: &CacheIndex) -> io::Result<()> {
        let encoded =
            serde_json::to_vec_pretty(index).map_err(|err| io::Error::other(err.to_string()))?;
        fs::write(&self.index_path, encoded)
    }

    fn lock(&self) -> MutexGuard<'_, CacheIndex> {
        self.index
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl MediaFileStore for DiskMediaStore {
    async fn search(
        &self,
        kind: MediaKind,
        mime_type: Option<&str>,
        url: &str,
    ) -> Result<CacheProbe, MediaError> {
        let mime_type = mime_type.map(str::to_owned);
        let url = url.to_owned();
        self.run_blocking(move |store| store.search(kind, mime_type.as_deref(), &url))
            .await
    }

    async fn record(&self, kind: MediaKind, url: &str, path: &Path) -> Result<(), MediaError> {
        let url = url.to_owned();
        let path = path.to_path_buf();
        self.run_blocking(move |store| store.record(kind, &url, &path))
            .await
    }

    fn target_path(&self, kind: MediaKind, mime_type: Option<&str>, url: &str) -> PathBuf {
        self.inner.target_path(kind, mime_type, url)
    }
}

fn cache_key(kind: MediaKind, url: &str) -> String {
    format!("{}:{url}", kind.dir_name())
}

fn total_size_bytes(index: &CacheIndex) -> u64 {
    index.entries.values().map(|entry| entry.size).sum()
}

fn load_index(path: &Path) -> Option<CacheIndex> {
    let bytes = fs::read(path).ok()?;
    serde_json::from_slice::<CacheIndex>(&bytes).ok()
}

fn extension_from_mime(mime_type: Option<&str>) -> Option<&'static str> {
    match mime_type?.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        "video/mp4" => Some("mp4"),
        "video/quicktime" => Some("mov"),
        "audio/mpeg" => Some("mp3"),
        "audio/aac" => Some("aac"),
        "audio/ogg" => Some("ogg"),
        _ => None,
    }
}

fn extension_from_url(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next()?;
    let (_, ext) = path.rsplit_once('.')?;
    match ext.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("jpg"),
        "png" => Some("png"),
        "gif" => Some("gif"),
        "webp" => Some("webp"),
        "mp4" => Some("mp4"),
        "mov" => Some("mov"),
        "mp3" => Some("mp3"),
        "m4a" => Some("m4a"),
        "ogg" => Some("ogg"),
        _ => None,
    }
}

fn stable_hash(key: &str) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://chat.example.org/file-upload/a.png?rc_uid=u&rc_token=t";

    #[tokio::test]
    async fn search_miss_then_record_hits() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DiskMediaStore::new(dir.path()).expect("store should open");

        let probe = store
            .search(MediaKind::Image, Some("image/png"), URL)
            .await
            .expect("search should work");
        assert!(!probe.exists);
        assert!(probe.path.starts_with(dir.path().join("media-cache").join("image")));
        assert_eq!(probe.path.extension().and_then(|ext| ext.to_str()), Some("png"));

        fs::write(&probe.path, b"png bytes").expect("write file");
        store
            .record(MediaKind::Image, URL, &probe.path)
            .await
            .expect("record should work");

        let hit = store
            .search(MediaKind::Image, Some("image/png"), URL)
            .await
            .expect("search should work");
        assert!(hit.exists);
        assert_eq!(hit.path, probe.path);

        let reopened = DiskMediaStore::new(dir.path()).expect("store should reopen");
        let hit = reopened
            .search(MediaKind::Image, None, URL)
            .await
            .expect("search should work");
        assert!(hit.exists, "index should survive reopening");
    }

    #[tokio::test]
    async fn missing_file_is_a_miss() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DiskMediaStore::new(dir.path()).expect("store should open");
        let probe = store
            .search(MediaKind::Video, None, "https://chat.example.org/v.mp4")
            .await
            .expect("search");
        fs::write(&probe.path, b"video").expect("write file");
        store
            .record(MediaKind::Video, "https://chat.example.org/v.mp4", &probe.path)
            .await
            .expect("record");
        fs::remove_file(&probe.path).expect("remove file");

        let probe = store
            .search(MediaKind::Video, None, "https://chat.example.org/v.mp4")
            .await
            .expect("search");
        assert!(!probe.exists);
        assert_eq!(probe.path.extension().and_then(|ext| ext.to_str()), Some("mp4"));
    }

    #[tokio::test]
    async fn evicts_least_recent_entry_over_capacity() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DiskMediaStore::with_capacity(dir.path(), 10).expect("store should open");

        let first = store
            .search(MediaKind::Audio, Some("audio/mpeg"), "https://chat.example.org/1")
            .await
            .expect("search");
        fs::write(&first.path, b"12345678").expect("write first");
        store
            .record(MediaKind::Audio, "https://chat.example.org/1", &first.path)
            .await
            .expect("record first");

        let second = store
            .search(MediaKind::Audio, Some("audio/mpeg"), "https://chat.example.org/2")
            .await
            .expect("search");
        fs::write(&second.path, b"12345678").expect("write second");
        store
            .record(MediaKind::Audio, "https://chat.example.org/2", &second.path)
            .await
            .expect("record second");

        assert!(!first.path.exists(), "older file should be evicted");
        assert!(second.path.exists());
        let probe = store
            .search(MediaKind::Audio, None, "https://chat.example.org/1")
            .await
            .expect("search");
        assert!(!probe.exists);
    }

    #[tokio::test]
    async fn target_path_matches_search_miss_and_stays_under_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = DiskMediaStore::new(dir.path()).expect("store should open");

        let target = store.target_path(MediaKind::Image, Some("image/png"), URL);
        assert!(target.starts_with(store.root()));
        let probe = store
            .search(MediaKind::Image, Some("image/png"), URL)
            .await
            .expect("search");
        assert_eq!(probe.path, target);
        assert!(target.parent().is_some_and(Path::is_dir));
    }

    #[test]
    fn picks_extension_from_mime_then_url() {
        assert_eq!(extension_from_mime(Some("IMAGE/JPEG")), Some("jpg"));
        assert_eq!(extension_from_mime(Some("application/pdf")), None);
        assert_eq!(extension_from_url("https://x.org/a.GIF?rc_token=t"), Some("gif"));
        assert_eq!(extension_from_url("https://x.org/file"), None);
    }
}
