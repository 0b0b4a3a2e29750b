//! Autocomplete trigger tracking and completion commit.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    error::EditError,
    text_edit::{Selection, TextBuffer, utf16_len},
};

// Trailing run of non-whitespace before the cursor: the token being typed.
static MENTION_REGEXP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\s]*$").expect("mention regexp must compile"));

/// Character that opens an autocomplete query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    /// `@` user mention.
    User,
    /// `#` room mention.
    Room,
    /// `!` canned response.
    CannedResponse,
    /// `/` slash command, only at the start of the buffer.
    Command,
}

impl TriggerKind {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '@' => Some(Self::User),
            '#' => Some(Self::Room),
            '!' => Some(Self::CannedResponse),
            '/' => Some(Self::Command),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::User => '@',
            Self::Room => '#',
            Self::CannedResponse => '!',
            Self::Command => '/',
        }
    }
}

/// Token currently typed after a trigger character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerToken {
    pub trigger: TriggerKind,
    /// Offset of the trigger character, in code units.
    pub start: usize,
    /// Text typed after the trigger character.
    pub query: String,
}

/// Autocomplete row picked by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionItem {
    /// Primary label (room name, canned response text, command).
    pub title: String,
    /// Canonical handle, used for user mentions.
    pub subtitle: Option<String>,
}

impl CompletionItem {
    /// Text inserted for this item under `trigger`.
    pub fn completion_text(&self, trigger: TriggerKind) -> &str {
        match trigger {
            TriggerKind::User => self.subtitle.as_deref().unwrap_or(&self.title),
            _ => &self.title,
        }
    }
}

/// Find the trigger token that ends at the cursor, if any.
pub fn detect_trigger(buffer: &TextBuffer) -> Option<TriggerToken> {
    let cursor = buffer.cursor();
    let before = &buffer.units()[..cursor];
    let start = before
        .iter()
        .rposition(|unit| is_whitespace_unit(*unit))
        .map_or(0, |idx| idx + 1);
    let first = char::from_u32(u32::from(*before.get(start)?))?;
    let trigger = TriggerKind::from_char(first)?;
    if trigger == TriggerKind::Command && start != 0 {
        return None;
    }

    Some(TriggerToken {
        trigger,
        start,
        query: String::from_utf16_lossy(&before[start + 1..]),
    })
}

/// Replace the token being typed with the completion for `item`.
///
/// A canned-response trigger (`!`) is removed together with its query; other
/// triggers are replaced by the completion text as a whole token. The caret
/// lands right after the completion, before the appended space.
pub fn commit_completion(
    buffer: &TextBuffer,
    trigger: TriggerKind,
    item: &CompletionItem,
) -> Result<TextBuffer, EditError> {
    let units = buffer.units();
    let cursor = buffer.cursor();

    let prefix_end = match trigger {
        TriggerKind::CannedResponse => {
            let search_end = cursor.min(units.len().saturating_sub(1));
            units
                .get(..=search_end)
                .and_then(|window| window.iter().rposition(|unit| *unit == u16::from(b'!')))
                .unwrap_or(0)
        }
        _ => cursor,
    };
    let kept = strip_trailing_token(&units[..prefix_end]);

    let completion = item.completion_text(trigger);
    let insertion = format!("{completion} ");
    let caret = kept + utf16_len(completion);
    trace!(cursor, kept, caret, trigger = ?trigger, "committing autocomplete selection");

    buffer.replace_with_selection(kept..cursor, &insertion, Selection::caret(caret))
}

/// Length of `prefix` once the trailing token has been removed.
fn strip_trailing_token(prefix: &[u16]) -> usize {
    // Lossy decoding maps each unpaired surrogate to one U+FFFD, so unit
    // counts survive the round trip.
    let decoded = String::from_utf16_lossy(prefix);
    match MENTION_REGEXP.find(&decoded) {
        Some(found) => utf16_len(&decoded[..found.start()]),
        None => prefix.len(),
    }
}

fn is_whitespace_unit(unit: u16) -> bool {
    char::from_u32(u32::from(unit)).is_some_and(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, subtitle: Option<&str>) -> CompletionItem {
        CompletionItem {
            title: title.to_owned(),
            subtitle: subtitle.map(str::to_owned),
        }
    }

    #[test]
    fn user_mention_uses_handle_and_parks_caret_before_space() {
        let buffer = TextBuffer::new("Hello @joh");
        let token = detect_trigger(&buffer).expect("trigger should be detected");
        assert_eq!(token.trigger, TriggerKind::User);
        assert_eq!(token.start, 6);
        assert_eq!(token.query, "joh");

        let edited = commit_completion(&buffer, token.trigger, &item("John Doe", Some("john.doe")))
            .expect("commit");
        assert_eq!(edited.text(), "Hello john.doe ");
        assert_eq!(edited.cursor(), 14);
    }

    #[test]
    fn canned_response_drops_exclamation_mark() {
        let buffer = TextBuffer::new("Need !he");
        let edited = commit_completion(&buffer, TriggerKind::CannedResponse, &item("help-text", None))
            .expect("commit");
        assert_eq!(edited.text(), "Need help-text ");
        assert_eq!(edited.cursor(), 14);
    }

    #[test]
    fn completion_keeps_text_after_cursor() {
        let buffer = TextBuffer::with_selection("see #gen now", Selection::caret(8)).expect("valid");
        let token = detect_trigger(&buffer).expect("trigger");
        assert_eq!(token.trigger, TriggerKind::Room);

        let edited = commit_completion(&buffer, token.trigger, &item("general", Some("ignored")))
            .expect("commit");
        assert_eq!(edited.text(), "see general  now");
        assert_eq!(edited.cursor(), 11);
    }

    #[test]
    fn slash_command_only_triggers_at_buffer_start() {
        let at_start = detect_trigger(&TextBuffer::new("/gi")).expect("command trigger");
        assert_eq!(at_start.trigger, TriggerKind::Command);
        assert_eq!(at_start.query, "gi");

        assert_eq!(detect_trigger(&TextBuffer::new("path a/b")), None);
        assert_eq!(detect_trigger(&TextBuffer::new("x /gi")), None);
    }

    #[test]
    fn no_trigger_after_whitespace_or_plain_word() {
        assert_eq!(detect_trigger(&TextBuffer::new("Hello @joh ")), None);
        assert_eq!(detect_trigger(&TextBuffer::new("Hello")), None);
        assert_eq!(detect_trigger(&TextBuffer::new("")), None);
    }

    #[test]
    fn bare_trigger_has_empty_query() {
        let token = detect_trigger(&TextBuffer::new("hi @")).expect("trigger");
        assert_eq!(token.start, 3);
        assert_eq!(token.query, "");
    }

    #[test]
    fn user_mention_without_handle_falls_back_to_title() {
        assert_eq!(item("alice", None).completion_text(TriggerKind::User), "alice");
    }
}
