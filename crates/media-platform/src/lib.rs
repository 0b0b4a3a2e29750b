//! Collaborator contracts for attachment caching: the local file store, the
//! downloader and the auto-download preferences, plus in-memory
//! implementations used by tests and headless hosts.

/// Stable media error types and HTTP classification helpers.
pub mod error;
/// Attachment link resolution.
pub mod link;

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

pub use error::{MediaError, MediaErrorCategory, classify_http_status};
pub use link::resolve_attachment_url;

/// Media category of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
}

impl MediaKind {
    /// Preference key holding the auto-download flag for this kind.
    pub fn preference_key(self) -> &'static str {
        match self {
            Self::Image => "imagesPreferenceDownload",
            Self::Video => "videoPreferenceDownload",
            Self::Audio => "audioPreferenceDownload",
        }
    }

    /// Directory name used by disk-backed stores.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

/// Attachment fields relevant to caching, as delivered with a message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Attachment {
    /// Stable attachment ID (message ID plus index is fine).
    pub id: String,
    /// Link to the best-quality file. Points at the local file once cached.
    pub title_link: Option<String>,
    /// Link to the preview image.
    pub image_url: Option<String>,
    /// MIME type of the image, for example `image/png`.
    pub image_type: Option<String>,
    /// Markdown caption.
    pub description: Option<String>,
}

/// Result of a local cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheProbe {
    /// Whether a complete file is already cached.
    pub exists: bool,
    /// Location of the cached file, or where a download should be written.
    pub path: PathBuf,
}

/// Download order handed to a [`MediaDownloader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub kind: MediaKind,
    /// Destination file path.
    pub path: PathBuf,
}

/// Local media file cache.
#[async_trait]
pub trait MediaFileStore: Send + Sync {
    /// Look up the cached file for `url`.
    async fn search(
        &self,
        kind: MediaKind,
        mime_type: Option<&str>,
        url: &str,
    ) -> Result<CacheProbe, MediaError>;

    /// Record a finished download at `path` for `url`.
    async fn record(&self, kind: MediaKind, url: &str, path: &Path) -> Result<(), MediaError>;

    /// Where a download of `url` should be written. Must not touch storage.
    fn target_path(&self, kind: MediaKind, mime_type: Option<&str>, url: &str) -> PathBuf;
}

/// Remote media fetcher.
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download `request.url` into `request.path` and return the final path.
    ///
    /// Implementations should stop early and return a cancelled error once
    /// `cancel` fires.
    async fn download(
        &self,
        request: DownloadRequest,
        cancel: CancellationToken,
    ) -> Result<PathBuf, MediaError>;
}

/// User preferences controlling automatic downloads.
pub trait AutoDownloadPreferences: Send + Sync {
    fn auto_download_enabled(&self, kind: MediaKind) -> bool;
}

/// Fixed auto-download flags per media kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AutoDownloadSettings {
    pub images: bool,
    pub video: bool,
    pub audio: bool,
}

impl AutoDownloadPreferences for AutoDownloadSettings {
    fn auto_download_enabled(&self, kind: MediaKind) -> bool {
        match kind {
            MediaKind::Image => self.images,
            MediaKind::Video => self.video,
            MediaKind::Audio => self.audio,
        }
    }
}

/// In-memory file store: remembers recorded paths without touching disk.
#[derive(Clone, Debug)]
pub struct InMemoryMediaStore {
    root: PathBuf,
    data: Arc<RwLock<HashMap<(MediaKind, String), PathBuf>>>,
}

impl InMemoryMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            data: Arc::default(),
        }
    }

}

impl Default for InMemoryMediaStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

#[async_trait]
impl MediaFileStore for InMemoryMediaStore {
    async fn search(
        &self,
        kind: MediaKind,
        _mime_type: Option<&str>,
        url: &str,
    ) -> Result<CacheProbe, MediaError> {
        let data = self
            .data
            .read()
            .map_err(|_| MediaError::storage("poisoned lock"))?;
        Ok(match data.get(&(kind, url.to_owned())) {
            Some(path) => CacheProbe {
                exists: true,
                path: path.clone(),
            },
            None => CacheProbe {
                exists: false,
                path: self.target_path(kind, None, url),
            },
        })
    }

    async fn record(&self, kind: MediaKind, url: &str, path: &Path) -> Result<(), MediaError> {
        let mut data = self
            .data
            .write()
            .map_err(|_| MediaError::storage("poisoned lock"))?;
        data.insert((kind, url.to_owned()), path.to_path_buf());
        Ok(())
    }

    fn target_path(&self, kind: MediaKind, _mime_type: Option<&str>, url: &str) -> PathBuf {
        let file_name: String = url
            .chars()
            .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
            .collect();
        self.root.join(kind.dir_name()).join(file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trip() {
        let store = InMemoryMediaStore::new("/cache");
        let url = "https://chat.example.org/a.png";

        let probe = store
            .search(MediaKind::Image, Some("image/png"), url)
            .await
            .expect("search should work");
        assert!(!probe.exists);
        assert_eq!(
            probe.path,
            PathBuf::from("/cache/image/https___chat_example_org_a_png")
        );

        store
            .record(MediaKind::Image, url, &probe.path)
            .await
            .expect("record should work");
        let probe = store
            .search(MediaKind::Image, None, url)
            .await
            .expect("search should work");
        assert!(probe.exists);

        let other_kind = store
            .search(MediaKind::Video, None, url)
            .await
            .expect("search should work");
        assert!(!other_kind.exists);
    }

    #[test]
    fn settings_answer_per_kind() {
        let settings = AutoDownloadSettings {
            images: true,
            ..AutoDownloadSettings::default()
        };
        assert!(settings.auto_download_enabled(MediaKind::Image));
        assert!(!settings.auto_download_enabled(MediaKind::Video));
        assert_eq!(MediaKind::Audio.preference_key(), "audioPreferenceDownload");
    }
}
