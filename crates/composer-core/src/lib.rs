//! Client-side composer core shared by chat host views.
//!
//! This crate holds the message composer's editing state machine (text
//! buffer, emoji keyboard, autocomplete), its host event/output protocol,
//! and small pure presentation helpers (room icons, app actions, room info).

/// App lifecycle actions and reducer.
pub mod actions;
/// Host-view event/output channel primitives.
pub mod channel;
/// Emoji keyboard edits.
pub mod emoji;
/// Edit error types.
pub mod error;
/// Autocomplete trigger tracking and completion commit.
pub mod mention;
/// Post-render deferred task queue.
pub mod render_queue;
/// Room-type icon selection.
pub mod room_icon;
/// Direct-room info sections.
pub mod room_info;
/// Composer session state machine.
pub mod session;
/// UTF-16 text buffer and range replacement.
pub mod text_edit;
/// Host-facing protocol types (events, outputs, modes).
pub mod types;

pub use actions::{AppAction, AppState, InternetType, RootKind};
pub use channel::{ComposerChannelError, ComposerChannels, OutputStream, drive_session};
pub use emoji::{CustomEmoji, EmojiEdit, EmojiKeyboardEvent, EmojiSelection};
pub use error::EditError;
pub use mention::{CompletionItem, TriggerKind, TriggerToken};
pub use render_queue::{PostRenderQueue, PostRenderTask};
pub use room_icon::{RoomGlyph, RoomIcon, RoomIconRequest, RoomType, UserStatus, room_type_icon};
pub use session::{ComposerSession, ComposerSnapshot};
pub use text_edit::{Selection, TextBuffer};
pub use types::{ComposerAction, ComposerEvent, ComposerOutput, MicOrSend};
