//! Emoji keyboard edits: emoji-aware backspace, emoji insertion and the
//! search-bar toggle.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    error::EditError,
    text_edit::{Selection, TextBuffer},
};

const COPYRIGHT_SIGN: u16 = 0x00A9;
const REGISTERED_SIGN: u16 = 0x00AE;
const SYMBOL_BLOCK_START: u16 = 0x2000;
const SYMBOL_BLOCK_END: u16 = 0x3300;
const EMOJI_HIGH_SURROGATE_START: u16 = 0xD83C;
const EMOJI_HIGH_SURROGATE_END: u16 = 0xD83E;
const EMOJI_TRAILING_UNIT_START: u16 = 0xD000;
const EMOJI_TRAILING_UNIT_END: u16 = 0xDFFF;

/// Emoji picked on the keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmojiSelection {
    /// Standard emoji by shortcode, without colons (`smile`).
    Shortcode(String),
    /// Server-provided custom emoji.
    Custom(CustomEmoji),
}

/// Custom emoji record as delivered by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEmoji {
    pub name: String,
    pub extension: Option<String>,
}

/// Item event raised by the emoji keyboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmojiKeyboardEvent {
    BackspacePressed,
    EmojiPressed(EmojiSelection),
    SearchPressed,
}

/// Result of applying a keyboard event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmojiEdit {
    /// New buffer to push into the input.
    Text(TextBuffer),
    /// Hide the emoji keyboard and show the emoji search bar.
    OpenSearch,
}

/// Apply one emoji keyboard event to `buffer`.
pub fn apply_keyboard_event(
    buffer: &TextBuffer,
    event: &EmojiKeyboardEvent,
) -> Result<EmojiEdit, EditError> {
    match event {
        EmojiKeyboardEvent::BackspacePressed => backspace(buffer).map(EmojiEdit::Text),
        EmojiKeyboardEvent::EmojiPressed(emoji) => insert_emoji(buffer, emoji).map(EmojiEdit::Text),
        EmojiKeyboardEvent::SearchPressed => Ok(EmojiEdit::OpenSearch),
    }
}

/// Delete one character before the cursor, two code units when the
/// preceding window looks like an emoji.
///
/// With the cursor at 0 the window and the deletion fall back to the end of
/// the buffer.
pub fn backspace(buffer: &TextBuffer) -> Result<TextBuffer, EditError> {
    let len = buffer.len();
    if len == 0 {
        return Ok(buffer.clone());
    }

    let cursor = buffer.cursor();
    let edit_end = if cursor > 0 { cursor } else { len };
    let window = &buffer.units()[edit_end.saturating_sub(2)..edit_end];
    let remove_count = if window_has_emoji(window) { 2 } else { 1 }.min(edit_end);
    let new_cursor = cursor.saturating_sub(remove_count);
    trace!(cursor, edit_end, remove_count, "emoji keyboard backspace");

    let edited = buffer.replace_units(edit_end - remove_count..edit_end, &[])?;
    edited.select(Selection::caret(new_cursor))
}

/// Insert the display text of `emoji` at the cursor.
pub fn insert_emoji(buffer: &TextBuffer, emoji: &EmojiSelection) -> Result<TextBuffer, EditError> {
    let text = emoji_text(emoji);
    let cursor = buffer.cursor();
    buffer.replace(cursor..cursor, &text)
}

/// Text inserted for `emoji`: the glyph for known shortcodes, `:name:`
/// otherwise.
pub fn emoji_text(emoji: &EmojiSelection) -> String {
    match emoji {
        EmojiSelection::Shortcode(shortcode) => shortname_to_unicode(shortcode),
        EmojiSelection::Custom(custom) => format!(":{}:", custom.name),
    }
}

/// Resolve a shortcode (with or without surrounding colons) to its glyph.
pub fn shortname_to_unicode(shortcode: &str) -> String {
    let bare = shortcode.trim_matches(':');
    match emojis::get_by_shortcode(bare) {
        Some(emoji) => emoji.as_str().to_owned(),
        None => format!(":{bare}:"),
    }
}

fn window_has_emoji(window: &[u16]) -> bool {
    window.iter().enumerate().any(|(idx, &unit)| {
        if unit == COPYRIGHT_SIGN
            || unit == REGISTERED_SIGN
            || (SYMBOL_BLOCK_START..=SYMBOL_BLOCK_END).contains(&unit)
        {
            return true;
        }
        (EMOJI_HIGH_SURROGATE_START..=EMOJI_HIGH_SURROGATE_END).contains(&unit)
            && window
                .get(idx + 1)
                .is_some_and(|next| (EMOJI_TRAILING_UNIT_START..=EMOJI_TRAILING_UNIT_END).contains(next))
    })
}
