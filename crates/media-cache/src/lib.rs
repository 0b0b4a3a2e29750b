//! Attachment caching for chat message views.
//!
//! Each rendered attachment owns an [`AttachmentCacheSequencer`] that checks
//! the local store, joins or starts a download through the shared
//! [`DownloadRegistry`], and answers taps. [`DiskMediaStore`] and
//! [`HttpMediaDownloader`] are the production collaborators.

/// JSON-indexed on-disk attachment store.
pub mod disk_store;
/// reqwest downloader.
pub mod http;
/// Shared in-flight download registry.
pub mod registry;
/// Per-attachment cache sequencing.
pub mod sequencer;
/// Attachment cache lifecycle.
pub mod state_machine;

pub use disk_store::DiskMediaStore;
pub use http::HttpMediaDownloader;
pub use registry::{DownloadKey, DownloadLease, DownloadOutcome, DownloadRegistry, DownloadWatch};
pub use sequencer::{AttachmentCacheSequencer, SequencerDeps, TapOutcome, ViewerContext};
pub use state_machine::{AttachmentCacheState, AttachmentStateMachine};
