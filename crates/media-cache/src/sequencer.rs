//! Per-attachment cache sequencing: check the local store, join or start a
//! download, and react to taps.

use std::{path::PathBuf, sync::Arc};

use media_platform::{
    Attachment, AutoDownloadPreferences, DownloadRequest, MediaDownloader, MediaError,
    MediaFileStore, MediaKind, resolve_attachment_url,
};
use tracing::{debug, info, warn};

use crate::{
    registry::{DownloadKey, DownloadLease, DownloadOutcome, DownloadRegistry, DownloadWatch},
    state_machine::{AttachmentCacheState, AttachmentStateMachine},
};

/// Services shared by every attachment view.
#[derive(Clone)]
pub struct SequencerDeps {
    pub store: Arc<dyn MediaFileStore>,
    pub downloader: Arc<dyn MediaDownloader>,
    pub preferences: Arc<dyn AutoDownloadPreferences>,
    pub registry: DownloadRegistry,
}

/// Identity and server of the viewing user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ViewerContext {
    pub user_id: String,
    pub token: String,
    pub base_url: String,
}

/// What the host should do after a tap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TapOutcome {
    /// A running download was cancelled.
    Cancelled,
    /// A download was started or joined.
    DownloadStarted,
    /// Open the full attachment; `title_link` points at the local file.
    ShowAttachment(Attachment),
    /// Nothing to do, e.g. no URL to fetch.
    Ignored,
}

pub struct AttachmentCacheSequencer {
    deps: SequencerDeps,
    kind: MediaKind,
    attachment: Attachment,
    display_url: Option<String>,
    cache_url: Option<String>,
    own_message: bool,
    is_reply: bool,
    target_path: Option<PathBuf>,
    machine: AttachmentStateMachine,
    watch: Option<DownloadWatch>,
}

impl AttachmentCacheSequencer {
    /// `image_url` overrides the attachment's own link when set; `author_id`
    /// is the sender of the message carrying the attachment.
    pub fn new(
        deps: SequencerDeps,
        kind: MediaKind,
        attachment: Attachment,
        image_url: Option<String>,
        viewer: &ViewerContext,
        author_id: Option<&str>,
    ) -> Self {
        let resolve = |link: Option<&str>| {
            image_url.clone().or_else(|| {
                resolve_attachment_url(link, &viewer.user_id, &viewer.token, &viewer.base_url)
            })
        };
        let display_url = resolve(attachment.image_url.as_deref());
        let cache_url = resolve(
            attachment
                .title_link
                .as_deref()
                .or(attachment.image_url.as_deref()),
        );
        let own_message = author_id.is_some_and(|author| author == viewer.user_id);

        Self {
            deps,
            kind,
            attachment,
            display_url,
            cache_url,
            own_message,
            is_reply: false,
            target_path: None,
            machine: AttachmentStateMachine::default(),
            watch: None,
        }
    }

    /// Mark this view as a reply preview; taps on it do nothing.
    pub fn reply_preview(mut self, is_reply: bool) -> Self {
        self.is_reply = is_reply;
        self
    }

    pub fn state(&self) -> &AttachmentCacheState {
        self.machine.state()
    }

    pub fn attachment(&self) -> &Attachment {
        &self.attachment
    }

    /// Markdown caption shown under the attachment, if any.
    pub fn caption(&self) -> Option<&str> {
        self.attachment
            .description
            .as_deref()
            .map(str::trim)
            .filter(|caption| !caption.is_empty())
    }

    /// URL to render; `None` means the attachment renders nothing.
    pub fn display_url(&self) -> Option<&str> {
        self.display_url.as_deref()
    }

    /// URL keyed in the store and the download registry.
    pub fn cache_url(&self) -> Option<&str> {
        self.cache_url.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.machine.state().is_loading()
    }

    /// Run the initial cache check. Auto-downloads are spawned on the current
    /// tokio runtime; call [`Self::settle`] to wait for them.
    pub async fn mount(&mut self) -> Result<&AttachmentCacheState, MediaError> {
        let Some(cache_url) = self.cache_url.clone() else {
            debug!(attachment = %self.attachment.id, "no attachment URL, nothing to cache");
            return Ok(self.machine.state());
        };
        if self.display_url.is_none() {
            return Ok(self.machine.state());
        }

        self.machine.begin_check()?;
        let probe = match self
            .deps
            .store
            .search(self.kind, self.attachment.image_type.as_deref(), &cache_url)
            .await
        {
            Ok(probe) => probe,
            Err(err) => {
                warn!(error = %err, url = %cache_url, "attachment cache lookup failed");
                self.machine.on_failed()?;
                return Ok(self.machine.state());
            }
        };

        if probe.exists {
            self.mark_cached(probe.path)?;
            return Ok(self.machine.state());
        }
        self.target_path = Some(probe.path);

        let key = DownloadKey::new(self.kind, cache_url);
        if let Some(watch) = self.deps.registry.attach(&key) {
            debug!(url = %key.url, "joining download already in flight");
            self.machine.begin_download(false)?;
            self.watch = Some(watch);
            return Ok(self.machine.state());
        }

        if self.own_message || self.deps.preferences.auto_download_enabled(self.kind) {
            self.start_download()?;
        } else {
            self.machine.on_failed()?;
        }
        Ok(self.machine.state())
    }

    /// Wait for the current download, if any, and apply its outcome.
    /// Cancel-safe.
    pub async fn settle(&mut self) -> Result<&AttachmentCacheState, MediaError> {
        let Some(watch) = self.watch.as_mut() else {
            return Ok(self.machine.state());
        };
        let outcome = watch.outcome().await;
        self.watch = None;

        match outcome {
            DownloadOutcome::Completed(path) => self.mark_cached(path)?,
            DownloadOutcome::Failed(err) => {
                warn!(error = %err, attachment = %self.attachment.id, "attachment download failed");
                self.machine.on_failed()?;
            }
            DownloadOutcome::Cancelled => self.machine.on_cancelled()?,
        }
        Ok(self.machine.state())
    }

    pub fn tap(&mut self) -> Result<TapOutcome, MediaError> {
        if self.is_reply {
            return Ok(TapOutcome::Ignored);
        }
        match self.machine.state() {
            AttachmentCacheState::Cached(_) => Ok(TapOutcome::ShowAttachment(self.attachment.clone())),
            AttachmentCacheState::Downloading { .. } => {
                self.cancel()?;
                Ok(TapOutcome::Cancelled)
            }
            AttachmentCacheState::Failed | AttachmentCacheState::Cancelled => {
                let key = self.download_key()?;
                if let Some(watch) = self.deps.registry.attach(&key) {
                    self.machine.begin_download(false)?;
                    self.watch = Some(watch);
                } else {
                    self.start_download()?;
                }
                Ok(TapOutcome::DownloadStarted)
            }
            AttachmentCacheState::Unchecked | AttachmentCacheState::Checking => {
                Ok(TapOutcome::Ignored)
            }
        }
    }

    /// Cancel the running download for this attachment's URL.
    pub fn cancel(&mut self) -> Result<(), MediaError> {
        if !self.machine.state().is_loading() {
            return Err(MediaError::invalid_state(self.machine.state(), "cancel"));
        }
        let key = self.download_key()?;
        self.deps.registry.cancel(&key);
        self.watch = None;
        self.machine.on_cancelled()?;
        info!(url = %key.url, "attachment download cancelled by user");
        Ok(())
    }

    fn start_download(&mut self) -> Result<(), MediaError> {
        let key = self.download_key()?;
        let Some(lease) = self.deps.registry.begin(key.clone()) else {
            // Lost a race with another view; watch its download instead.
            let watch = self
                .deps
                .registry
                .attach(&key)
                .ok_or_else(|| MediaError::invalid_state(self.machine.state(), "join_download"))?;
            self.machine.begin_download(false)?;
            self.watch = Some(watch);
            return Ok(());
        };

        let watch = lease
            .subscribe()
            .ok_or_else(|| MediaError::invalid_state(self.machine.state(), "start_download"))?;
        let path = match &self.target_path {
            Some(path) => path.clone(),
            None => self.deps.store.target_path(
                self.kind,
                self.attachment.image_type.as_deref(),
                &key.url,
            ),
        };

        self.machine.begin_download(true)?;
        self.watch = Some(watch);
        info!(url = %key.url, kind = ?self.kind, "starting attachment download");
        tokio::spawn(run_download(self.deps.clone(), lease, path));
        Ok(())
    }

    fn mark_cached(&mut self, path: PathBuf) -> Result<(), MediaError> {
        self.attachment.title_link = Some(path.to_string_lossy().to_string());
        self.machine.on_cached(path)
    }

    fn download_key(&self) -> Result<DownloadKey, MediaError> {
        self.cache_url
            .clone()
            .map(|url| DownloadKey::new(self.kind, url))
            .ok_or_else(|| MediaError::invalid_state(self.machine.state(), "download_without_url"))
    }
}

async fn run_download(deps: SequencerDeps, lease: DownloadLease, path: PathBuf) {
    let DownloadKey { kind, url } = lease.key().clone();
    let cancel = lease.cancel_token();
    let request = DownloadRequest {
        url: url.clone(),
        kind,
        path,
    };

    let outcome = match deps.downloader.download(request, cancel.clone()).await {
        Ok(_) if cancel.is_cancelled() => DownloadOutcome::Cancelled,
        Ok(path) => match deps.store.record(kind, &url, &path).await {
            Ok(()) => DownloadOutcome::Completed(path),
            Err(err) => DownloadOutcome::Failed(err),
        },
        Err(err) if err.is_cancelled() || cancel.is_cancelled() => DownloadOutcome::Cancelled,
        Err(err) => DownloadOutcome::Failed(err),
    };
    lease.finish(outcome);
}
