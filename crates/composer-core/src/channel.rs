use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error};

use crate::{
    session::ComposerSession,
    types::{ComposerEvent, ComposerOutput},
};

/// Broadcast output stream type used by host view subscribers.
pub type OutputStream = broadcast::Receiver<ComposerOutput>;

/// Errors returned by composer channel operations.
#[derive(Debug, Error)]
pub enum ComposerChannelError {
    /// The session side stopped receiving events.
    #[error("composer event channel is closed")]
    EventChannelClosed,
}

/// Event/output channel pair connecting a host view to its composer session.
#[derive(Clone, Debug)]
pub struct ComposerChannels {
    event_tx: mpsc::Sender<ComposerEvent>,
    output_tx: broadcast::Sender<ComposerOutput>,
}

impl ComposerChannels {
    /// Create a new channel set and return it with the event receiver.
    pub fn new(
        event_buffer: usize,
        output_buffer: usize,
    ) -> (Self, mpsc::Receiver<ComposerEvent>) {
        let (event_tx, event_rx) = mpsc::channel(event_buffer.max(1));
        let (output_tx, _) = broadcast::channel(output_buffer.max(1));

        (
            Self {
                event_tx,
                output_tx,
            },
            event_rx,
        )
    }

    /// Clone the output sender.
    pub fn output_sender(&self) -> broadcast::Sender<ComposerOutput> {
        self.output_tx.clone()
    }

    /// Subscribe to session outputs.
    pub fn subscribe(&self) -> OutputStream {
        self.output_tx.subscribe()
    }

    /// Send one host event to the session.
    pub async fn send_event(&self, event: ComposerEvent) -> Result<(), ComposerChannelError> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| ComposerChannelError::EventChannelClosed)
    }
}

/// Run `session` until every event sender is dropped, publishing outputs.
///
/// Edit errors are logged and the offending event is dropped; the session
/// keeps its previous state.
pub async fn drive_session(
    mut session: ComposerSession,
    mut events: mpsc::Receiver<ComposerEvent>,
    outputs: broadcast::Sender<ComposerOutput>,
) -> ComposerSession {
    debug!("composer session worker started");
    while let Some(event) = events.recv().await {
        match session.apply(event) {
            Ok(produced) => {
                for output in produced {
                    let _ = outputs.send(output);
                }
            }
            Err(err) => error!(error = %err, "composer event rejected"),
        }
    }
    debug!("composer session worker exiting");
    session
}
