//! Shared registry of in-flight attachment downloads, keyed by media kind and
//! URL, so that only one transfer runs per URL across all attachment views.

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard},
};

use media_platform::{MediaError, MediaKind};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Registry key: one download per kind and URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DownloadKey {
    pub kind: MediaKind,
    pub url: String,
}

impl DownloadKey {
    pub fn new(kind: MediaKind, url: impl Into<String>) -> Self {
        Self {
            kind,
            url: url.into(),
        }
    }
}

/// How a registered download ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// File written and recorded at this path.
    Completed(PathBuf),
    /// Transfer or bookkeeping failed.
    Failed(MediaError),
    /// Cancelled by a user or abandoned by its owner.
    Cancelled,
}

type OutcomeSender = watch::Sender<Option<DownloadOutcome>>;

#[derive(Debug)]
struct InFlight {
    id: u64,
    cancel: CancellationToken,
    outcome_tx: OutcomeSender,
    attached: usize,
}

#[derive(Debug, Default)]
struct RegistryInner {
    entries: HashMap<DownloadKey, InFlight>,
    next_id: u64,
}

/// Cloneable handle to the shared download registry.
#[derive(Debug, Clone, Default)]
pub struct DownloadRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl DownloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a download for `key` is registered.
    pub fn is_in_flight(&self, key: &DownloadKey) -> bool {
        self.lock().entries.contains_key(key)
    }

    /// Number of attachment views currently watching `key`.
    pub fn attached_count(&self, key: &DownloadKey) -> usize {
        self.lock()
            .entries
            .get(key)
            .map_or(0, |entry| entry.attached)
    }

    /// Register a new download for `key`.
    ///
    /// Returns `None` when one is already in flight; attach to it instead.
    pub fn begin(&self, key: DownloadKey) -> Option<DownloadLease> {
        let mut inner = self.lock();
        if inner.entries.contains_key(&key) {
            return None;
        }

        inner.next_id += 1;
        let id = inner.next_id;
        let cancel = CancellationToken::new();
        let (outcome_tx, _) = watch::channel(None);
        inner.entries.insert(
            key.clone(),
            InFlight {
                id,
                cancel: cancel.clone(),
                outcome_tx,
                attached: 0,
            },
        );
        debug!(url = %key.url, kind = ?key.kind, id, "download registered");

        Some(DownloadLease {
            registry: self.clone(),
            key,
            id,
            cancel,
            finished: false,
        })
    }

    /// Watch the download registered for `key`, if any.
    pub fn attach(&self, key: &DownloadKey) -> Option<DownloadWatch> {
        let mut inner = self.lock();
        let entry = inner.entries.get_mut(key)?;
        entry.attached += 1;
        trace!(url = %key.url, attached = entry.attached, "attached to download");

        Some(DownloadWatch {
            registry: self.clone(),
            key: key.clone(),
            id: entry.id,
            outcome_rx: entry.outcome_tx.subscribe(),
        })
    }

    /// Cancel the download for `key`.
    ///
    /// Watchers see `Cancelled` immediately and the key is free for a new
    /// download; the transfer itself stops on a best-effort basis.
    pub fn cancel(&self, key: &DownloadKey) -> bool {
        let Some(entry) = self.lock().entries.remove(key) else {
            return false;
        };
        debug!(url = %key.url, id = entry.id, "download cancelled");
        entry.cancel.cancel();
        entry.outcome_tx.send_replace(Some(DownloadOutcome::Cancelled));
        true
    }

    fn complete(&self, key: &DownloadKey, id: u64, outcome: DownloadOutcome) {
        let mut inner = self.lock();
        // A cancelled key may already hold a newer download.
        if inner.entries.get(key).is_none_or(|entry| entry.id != id) {
            trace!(url = %key.url, id, "ignoring completion of a replaced download");
            return;
        }
        if let Some(entry) = inner.entries.remove(key) {
            debug!(url = %key.url, id, outcome = ?outcome, "download settled");
            entry.outcome_tx.send_replace(Some(outcome));
        }
    }

    fn detach(&self, key: &DownloadKey, id: u64) {
        let mut inner = self.lock();
        if let Some(entry) = inner.entries.get_mut(key)
            && entry.id == id
        {
            entry.attached = entry.attached.saturating_sub(1);
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Ownership of one registered download. Dropping it unfinished publishes
/// `Cancelled`.
#[derive(Debug)]
pub struct DownloadLease {
    registry: DownloadRegistry,
    key: DownloadKey,
    id: u64,
    cancel: CancellationToken,
    finished: bool,
}

impl DownloadLease {
    pub fn key(&self) -> &DownloadKey {
        &self.key
    }

    /// Token that fires when the download is cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Watch this download's outcome.
    pub fn subscribe(&self) -> Option<DownloadWatch> {
        self.registry.attach(&self.key)
    }

    /// Publish the outcome and release the key.
    pub fn finish(mut self, outcome: DownloadOutcome) {
        self.finished = true;
        self.registry.complete(&self.key, self.id, outcome);
    }
}

impl Drop for DownloadLease {
    fn drop(&mut self) {
        if !self.finished {
            self.registry
                .complete(&self.key, self.id, DownloadOutcome::Cancelled);
        }
    }
}

/// Observer of a registered download. Dropping it detaches from the entry.
#[derive(Debug)]
pub struct DownloadWatch {
    registry: DownloadRegistry,
    key: DownloadKey,
    id: u64,
    outcome_rx: watch::Receiver<Option<DownloadOutcome>>,
}

impl DownloadWatch {
    pub fn key(&self) -> &DownloadKey {
        &self.key
    }

    /// Wait for the download to settle. Cancel-safe.
    pub async fn outcome(&mut self) -> DownloadOutcome {
        loop {
            if let Some(outcome) = self.outcome_rx.borrow_and_update().clone() {
                return outcome;
            }
            if self.outcome_rx.changed().await.is_err() {
                return self
                    .outcome_rx
                    .borrow()
                    .clone()
                    .unwrap_or(DownloadOutcome::Cancelled);
            }
        }
    }
}

impl Drop for DownloadWatch {
    fn drop(&mut self) {
        self.registry.detach(&self.key, self.id);
    }
}
