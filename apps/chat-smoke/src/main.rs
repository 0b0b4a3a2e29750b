mod config;
mod logging;

use std::sync::Arc;

use composer_core::{
    ComposerAction, ComposerChannelError, ComposerChannels, ComposerEvent, ComposerOutput,
    ComposerSession, CompletionItem, EmojiKeyboardEvent, EmojiSelection, Selection,
    drive_session, session::action_label,
};
use config::SmokeConfig;
use media_cache::{
    AttachmentCacheSequencer, AttachmentCacheState, DiskMediaStore, DownloadRegistry,
    HttpMediaDownloader, SequencerDeps, TapOutcome,
};
use media_platform::{Attachment, MediaError, MediaKind};
use thiserror::Error;
use tokio::{sync::broadcast::error::TryRecvError, task::JoinError};
use tracing::{error, info, warn};

#[derive(Debug, Error)]
enum SmokeError {
    #[error(transparent)]
    Channel(#[from] ComposerChannelError),
    #[error("composer worker failed: {0}")]
    Worker(#[from] JoinError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error("failed to open media store: {0}")]
    Store(#[from] std::io::Error),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    logging::init();

    let config = match SmokeConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run_composer_script().await {
        error!(error = %err, "composer smoke failed");
        std::process::exit(1);
    }

    if let Err(err) = run_attachment_fetch(&config).await {
        error!(error = %err, "attachment smoke failed");
        std::process::exit(1);
    }
}

/// Drive a scripted composer session through the host channels.
async fn run_composer_script() -> Result<(), SmokeError> {
    let (channels, events) = ComposerChannels::new(16, 64);
    let mut outputs = channels.subscribe();
    let worker = tokio::spawn(drive_session(
        ComposerSession::new(),
        events,
        channels.output_sender(),
    ));

    let script = [
        ComposerEvent::FocusChanged(true),
        ComposerEvent::TextChanged {
            text: "Hello @joh".to_owned(),
            selection: Selection::caret(10),
        },
        ComposerEvent::AutocompleteSelected(CompletionItem {
            title: "John Doe".to_owned(),
            subtitle: Some("john.doe".to_owned()),
        }),
        ComposerEvent::RenderCompleted,
        ComposerEvent::OpenEmojiKeyboard,
        ComposerEvent::Keyboard(EmojiKeyboardEvent::EmojiPressed(EmojiSelection::Shortcode(
            "wave".to_owned(),
        ))),
        ComposerEvent::SendPressed,
        ComposerEvent::CloseEmojiKeyboardAndRun(ComposerAction::ChooseFile),
        ComposerEvent::RenderCompleted,
    ];
    for event in script {
        channels.send_event(event).await?;
    }
    drop(channels);

    let session = worker.await?;
    loop {
        match outputs.try_recv() {
            Ok(ComposerOutput::RunAction(action)) => {
                info!(action = action_label(action), "composer requested picker action");
            }
            Ok(ComposerOutput::SendMessage {
                client_txn_id,
                body,
            }) => info!(%client_txn_id, %body, "composer sent message"),
            Ok(output) => info!(?output, "composer output"),
            Err(TryRecvError::Lagged(skipped)) => warn!(skipped, "composer outputs lagged"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }

    let snapshot = session.snapshot();
    info!(
        text = %snapshot.text,
        mode = ?snapshot.mic_or_send,
        emoji_keyboard = snapshot.show_emoji_keyboard,
        "composer script finished"
    );
    Ok(())
}

/// Fetch `CHAT_ATTACHMENT_LINK` through the disk cache.
async fn run_attachment_fetch(config: &SmokeConfig) -> Result<(), SmokeError> {
    let Some(link) = config.attachment_link.clone() else {
        info!("CHAT_ATTACHMENT_LINK not set; skipping attachment fetch");
        return Ok(());
    };

    let store =
        DiskMediaStore::with_capacity(&config.media_dir, config.media_cache_capacity_bytes)?;
    let deps = SequencerDeps {
        store: Arc::new(store),
        downloader: Arc::new(HttpMediaDownloader::new()?),
        preferences: Arc::new(config.auto_download),
        registry: DownloadRegistry::new(),
    };
    let attachment = Attachment {
        id: "smoke:0".to_owned(),
        title_link: Some(link.clone()),
        image_url: Some(link),
        ..Attachment::default()
    };

    let mut sequencer = AttachmentCacheSequencer::new(
        deps,
        MediaKind::Image,
        attachment,
        None,
        &config.viewer(),
        None,
    );
    let state = sequencer.mount().await?.clone();
    info!(state = ?state, url = ?sequencer.display_url(), "attachment mounted");

    if state == AttachmentCacheState::Failed {
        let tap = sequencer.tap()?;
        info!(?tap, "auto-download disabled; tapped to download");
    }

    let settled = sequencer.settle().await?.clone();
    match settled {
        AttachmentCacheState::Cached(path) => {
            info!(path = %path.display(), "attachment cached");
            if let TapOutcome::ShowAttachment(attachment) = sequencer.tap()? {
                println!(
                    "{}",
                    attachment.title_link.as_deref().unwrap_or_default()
                );
            }
        }
        other => warn!(state = ?other, "attachment was not cached"),
    }
    Ok(())
}
