use serde::{Deserialize, Serialize};

use crate::{
    emoji::{EmojiKeyboardEvent, EmojiSelection},
    mention::{CompletionItem, TriggerToken},
    text_edit::Selection,
};

/// Right-hand composer button mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MicOrSend {
    /// Empty input: show the audio recorder button.
    #[default]
    Mic,
    /// Input has text: show the send button.
    Send,
}

/// Media picker action the host performs on behalf of the composer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ComposerAction {
    /// Open the camera for a photo.
    TakePhoto,
    /// Open the camera for a video.
    TakeVideo,
    /// Open the photo library.
    ChooseFromLibrary,
    /// Open the file picker.
    ChooseFile,
}

/// Input accepted by the composer session from its host view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ComposerEvent {
    /// Native input text changed.
    TextChanged {
        /// Full new input text.
        text: String,
        /// Selection reported with the change, in UTF-16 code units.
        selection: Selection,
    },
    /// Native input selection moved without a text change.
    SelectionChanged(Selection),
    /// Item event from the emoji keyboard.
    Keyboard(EmojiKeyboardEvent),
    /// Emoji picked from the emoji search bar.
    EmojiSelected(EmojiSelection),
    /// Row picked in the autocomplete panel.
    AutocompleteSelected(CompletionItem),
    /// Emoji keyboard button tapped.
    OpenEmojiKeyboard,
    /// Emoji keyboard dismissed by the composer.
    CloseEmojiKeyboard,
    /// Close the emoji keyboard, then run an action once it is gone.
    CloseEmojiKeyboardAndRun(ComposerAction),
    /// Custom keyboard resigned by the platform.
    KeyboardResigned,
    /// Hardware/system back button.
    BackPressed,
    /// System keyboard about to show.
    KeyboardWillShow {
        /// Keyboard height in points.
        height: f32,
    },
    /// System keyboard about to hide.
    KeyboardWillHide,
    /// Tracking view around the input changed height.
    TrackingViewResized {
        /// New height in points.
        height: f32,
    },
    /// Native input focus changed.
    FocusChanged(bool),
    /// Send button tapped.
    SendPressed,
    /// Host finished the render pass that reflects earlier outputs.
    RenderCompleted,
}

/// Output emitted by the composer session to its host view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ComposerOutput {
    /// Replace native input contents and selection.
    SetInput {
        /// New input text.
        text: String,
        /// New selection, in UTF-16 code units.
        selection: Selection,
    },
    /// Focus the native input.
    Focus,
    /// Autocomplete query changed; `None` closes the panel.
    AutocompleteQueryChanged(Option<TriggerToken>),
    /// Message ready to be sent.
    SendMessage {
        /// Session-generated transaction ID.
        client_txn_id: String,
        /// Trimmed message body.
        body: String,
    },
    /// Run a media picker action.
    RunAction(ComposerAction),
    /// Whether a back press was consumed by the composer.
    BackHandled(bool),
}
