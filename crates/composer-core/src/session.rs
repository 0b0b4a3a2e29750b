//! Composer session: owns the input buffer and the composer's view state,
//! consumes host events and produces host outputs.

use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::{
    emoji::{EmojiEdit, EmojiKeyboardEvent, apply_keyboard_event},
    error::EditError,
    mention::{TriggerToken, commit_completion, detect_trigger},
    render_queue::{PostRenderQueue, PostRenderTask},
    text_edit::{Selection, TextBuffer},
    types::{ComposerAction, ComposerEvent, ComposerOutput, MicOrSend},
};

/// Vertical gap between the composer and the autocomplete panel, in points.
const AUTOCOMPLETE_PANEL_GAP: f32 = 50.0;
/// Autocomplete panel height cap, in points.
pub const AUTOCOMPLETE_PANEL_MAX_HEIGHT: f32 = 216.0;

/// Immutable view of the session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposerSnapshot {
    pub text: String,
    pub selection: Selection,
    pub mic_or_send: MicOrSend,
    pub show_emoji_keyboard: bool,
    pub show_emoji_searchbar: bool,
    pub focused: bool,
    pub keyboard_height: f32,
    pub tracking_view_height: f32,
    pub autocomplete: Option<TriggerToken>,
}

impl ComposerSnapshot {
    /// Distance of the autocomplete panel from the bottom edge.
    pub fn autocomplete_bottom_offset(&self) -> f32 {
        self.tracking_view_height + self.keyboard_height + AUTOCOMPLETE_PANEL_GAP
    }

    /// The panel renders only with an active trigger and at least one result.
    pub fn shows_autocomplete(&self, item_count: usize) -> bool {
        self.autocomplete.is_some() && item_count > 0
    }
}

/// State of one message composer.
#[derive(Debug, Clone, Default)]
pub struct ComposerSession {
    buffer: TextBuffer,
    mic_or_send: MicOrSend,
    show_emoji_keyboard: bool,
    show_emoji_searchbar: bool,
    focused: bool,
    keyboard_height: f32,
    tracking_view_height: f32,
    autocomplete: Option<TriggerToken>,
    post_render: PostRenderQueue,
}

impl ComposerSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn autocomplete(&self) -> Option<&TriggerToken> {
        self.autocomplete.as_ref()
    }

    /// Number of tasks waiting for the next `RenderCompleted`.
    pub fn pending_post_render(&self) -> usize {
        self.post_render.len()
    }

    pub fn snapshot(&self) -> ComposerSnapshot {
        ComposerSnapshot {
            text: self.buffer.text(),
            selection: self.buffer.selection(),
            mic_or_send: self.mic_or_send,
            show_emoji_keyboard: self.show_emoji_keyboard,
            show_emoji_searchbar: self.show_emoji_searchbar,
            focused: self.focused,
            keyboard_height: self.keyboard_height,
            tracking_view_height: self.tracking_view_height,
            autocomplete: self.autocomplete.clone(),
        }
    }

    /// Feed one host event and collect the outputs it produces.
    pub fn apply(&mut self, event: ComposerEvent) -> Result<Vec<ComposerOutput>, EditError> {
        let mut out = Vec::new();

        match event {
            ComposerEvent::TextChanged { text, selection } => {
                self.buffer = TextBuffer::with_selection(&text, selection)?;
                self.refresh_mic_or_send();
                self.track_autocomplete(&mut out);
            }
            ComposerEvent::SelectionChanged(selection) => {
                self.buffer = self.buffer.select(selection)?;
                self.track_autocomplete(&mut out);
            }
            ComposerEvent::Keyboard(keyboard_event) => {
                self.apply_keyboard_event(&keyboard_event, &mut out)?;
            }
            ComposerEvent::EmojiSelected(emoji) => {
                self.apply_keyboard_event(&EmojiKeyboardEvent::EmojiPressed(emoji), &mut out)?;
            }
            ComposerEvent::AutocompleteSelected(item) => {
                let Some(token) = self.autocomplete.clone() else {
                    warn!(title = %item.title, "autocomplete selection without an active trigger");
                    return Ok(out);
                };
                let edited = commit_completion(&self.buffer, token.trigger, &item)?;
                self.set_input(edited, &mut out);
                out.push(ComposerOutput::Focus);
                // Closing the panel waits for the render that shows the new text.
                self.post_render.schedule(PostRenderTask::ClearAutocomplete);
            }
            ComposerEvent::OpenEmojiKeyboard => {
                debug!("opening emoji keyboard");
                self.show_emoji_keyboard = true;
                self.show_emoji_searchbar = false;
            }
            ComposerEvent::CloseEmojiKeyboard => self.close_emoji_keyboard(),
            ComposerEvent::CloseEmojiKeyboardAndRun(action) => {
                let keyboard_was_visible = self.show_emoji_keyboard;
                self.close_emoji_keyboard();
                if keyboard_was_visible {
                    self.post_render.schedule(PostRenderTask::RunAction(action));
                } else {
                    out.push(ComposerOutput::RunAction(action));
                }
            }
            ComposerEvent::KeyboardResigned => {
                if !self.show_emoji_searchbar {
                    self.close_emoji_keyboard();
                }
            }
            ComposerEvent::BackPressed => {
                let handled = self.show_emoji_searchbar;
                if handled {
                    self.show_emoji_searchbar = false;
                }
                out.push(ComposerOutput::BackHandled(handled));
            }
            ComposerEvent::KeyboardWillShow { height } => self.keyboard_height = height,
            ComposerEvent::KeyboardWillHide => self.keyboard_height = 0.0,
            ComposerEvent::TrackingViewResized { height } => self.tracking_view_height = height,
            ComposerEvent::FocusChanged(focused) => self.focused = focused,
            ComposerEvent::SendPressed => self.send_message(&mut out),
            ComposerEvent::RenderCompleted => self.flush_post_render(&mut out),
        }

        Ok(out)
    }

    fn apply_keyboard_event(
        &mut self,
        event: &EmojiKeyboardEvent,
        out: &mut Vec<ComposerOutput>,
    ) -> Result<(), EditError> {
        match apply_keyboard_event(&self.buffer, event)? {
            EmojiEdit::Text(edited) => self.set_input(edited, out),
            EmojiEdit::OpenSearch => {
                debug!("switching emoji keyboard to search bar");
                self.show_emoji_keyboard = false;
                self.show_emoji_searchbar = true;
            }
        }
        Ok(())
    }

    fn set_input(&mut self, buffer: TextBuffer, out: &mut Vec<ComposerOutput>) {
        trace!(len = buffer.len(), cursor = buffer.cursor(), "pushing input to host");
        self.buffer = buffer;
        self.refresh_mic_or_send();
        out.push(ComposerOutput::SetInput {
            text: self.buffer.text(),
            selection: self.buffer.selection(),
        });
    }

    fn send_message(&mut self, out: &mut Vec<ComposerOutput>) {
        let body = self.buffer.text().trim().to_owned();
        if body.is_empty() {
            debug!("ignoring send with blank input");
            return;
        }

        let client_txn_id = Uuid::new_v4().to_string();
        debug!(%client_txn_id, "composer sending message");
        out.push(ComposerOutput::SendMessage {
            client_txn_id,
            body,
        });
        self.set_input(TextBuffer::default(), out);
        if self.autocomplete.take().is_some() {
            out.push(ComposerOutput::AutocompleteQueryChanged(None));
        }
    }

    fn flush_post_render(&mut self, out: &mut Vec<ComposerOutput>) {
        for task in self.post_render.flush() {
            match task {
                PostRenderTask::ClearAutocomplete => {
                    if self.autocomplete.take().is_some() {
                        out.push(ComposerOutput::AutocompleteQueryChanged(None));
                    }
                }
                PostRenderTask::RunAction(action) => out.push(ComposerOutput::RunAction(action)),
            }
        }
    }

    fn track_autocomplete(&mut self, out: &mut Vec<ComposerOutput>) {
        let detected = detect_trigger(&self.buffer);
        if detected != self.autocomplete {
            trace!(token = ?detected, "autocomplete query changed");
            self.autocomplete = detected.clone();
            out.push(ComposerOutput::AutocompleteQueryChanged(detected));
        }
    }

    fn refresh_mic_or_send(&mut self) {
        self.mic_or_send = if self.buffer.text().trim().is_empty() {
            MicOrSend::Mic
        } else {
            MicOrSend::Send
        };
    }

    fn close_emoji_keyboard(&mut self) {
        debug!("closing emoji keyboard");
        self.show_emoji_keyboard = false;
        self.show_emoji_searchbar = false;
    }
}

/// Convenience for hosts that dispatch picker actions by name.
pub fn action_label(action: ComposerAction) -> &'static str {
    match action {
        ComposerAction::TakePhoto => "take_photo",
        ComposerAction::TakeVideo => "take_video",
        ComposerAction::ChooseFromLibrary => "choose_from_library",
        ComposerAction::ChooseFile => "choose_file",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        emoji::EmojiSelection,
        mention::{CompletionItem, TriggerKind},
    };

    fn type_text(session: &mut ComposerSession, text: &str) -> Vec<ComposerOutput> {
        let len = text.encode_utf16().count();
        session
            .apply(ComposerEvent::TextChanged {
                text: text.to_owned(),
                selection: Selection::caret(len),
            })
            .expect("text change should apply")
    }

    #[test]
    fn typing_toggles_mic_and_send() {
        let mut session = ComposerSession::new();
        assert_eq!(session.snapshot().mic_or_send, MicOrSend::Mic);

        type_text(&mut session, "hi");
        assert_eq!(session.snapshot().mic_or_send, MicOrSend::Send);

        type_text(&mut session, "   ");
        assert_eq!(session.snapshot().mic_or_send, MicOrSend::Mic);
    }

    #[test]
    fn autocomplete_clear_waits_for_render_completed() {
        let mut session = ComposerSession::new();
        let outputs = type_text(&mut session, "Hello @joh");
        assert_eq!(
            outputs,
            vec![ComposerOutput::AutocompleteQueryChanged(Some(TriggerToken {
                trigger: TriggerKind::User,
                start: 6,
                query: "joh".to_owned(),
            }))]
        );

        let outputs = session
            .apply(ComposerEvent::AutocompleteSelected(CompletionItem {
                title: "John Doe".to_owned(),
                subtitle: Some("john.doe".to_owned()),
            }))
            .expect("selection should apply");
        assert_eq!(
            outputs,
            vec![
                ComposerOutput::SetInput {
                    text: "Hello john.doe ".to_owned(),
                    selection: Selection::caret(14),
                },
                ComposerOutput::Focus,
            ]
        );
        assert!(session.autocomplete().is_some());
        assert_eq!(session.pending_post_render(), 1);

        let outputs = session
            .apply(ComposerEvent::RenderCompleted)
            .expect("flush should apply");
        assert_eq!(outputs, vec![ComposerOutput::AutocompleteQueryChanged(None)]);
        assert!(session.autocomplete().is_none());
    }

    #[test]
    fn selection_moving_away_clears_trigger() {
        let mut session = ComposerSession::new();
        type_text(&mut session, "@al hi");
        assert!(session.autocomplete().is_none());

        let outputs = session
            .apply(ComposerEvent::SelectionChanged(Selection::caret(3)))
            .expect("selection");
        assert!(matches!(
            outputs.as_slice(),
            [ComposerOutput::AutocompleteQueryChanged(Some(token))] if token.query == "al"
        ));

        let outputs = session
            .apply(ComposerEvent::SelectionChanged(Selection::caret(6)))
            .expect("selection");
        assert_eq!(outputs, vec![ComposerOutput::AutocompleteQueryChanged(None)]);
    }

    #[test]
    fn selection_without_trigger_is_ignored() {
        let mut session = ComposerSession::new();
        type_text(&mut session, "plain");
        let outputs = session
            .apply(ComposerEvent::AutocompleteSelected(CompletionItem {
                title: "x".to_owned(),
                subtitle: None,
            }))
            .expect("ignored selection");
        assert!(outputs.is_empty());
        assert_eq!(session.snapshot().text, "plain");
    }

    #[test]
    fn emoji_keyboard_edits_and_search_mode() {
        let mut session = ComposerSession::new();
        session
            .apply(ComposerEvent::OpenEmojiKeyboard)
            .expect("open");
        type_text(&mut session, "Hi ");

        let outputs = session
            .apply(ComposerEvent::Keyboard(EmojiKeyboardEvent::EmojiPressed(
                EmojiSelection::Shortcode("smile".to_owned()),
            )))
            .expect("emoji");
        assert_eq!(
            outputs,
            vec![ComposerOutput::SetInput {
                text: "Hi 😄".to_owned(),
                selection: Selection::caret(5),
            }]
        );

        session
            .apply(ComposerEvent::Keyboard(EmojiKeyboardEvent::BackspacePressed))
            .expect("backspace");
        assert_eq!(session.snapshot().text, "Hi ");

        session
            .apply(ComposerEvent::Keyboard(EmojiKeyboardEvent::SearchPressed))
            .expect("search");
        let snapshot = session.snapshot();
        assert!(!snapshot.show_emoji_keyboard);
        assert!(snapshot.show_emoji_searchbar);

        // Resigning keeps the search bar while it is open.
        session
            .apply(ComposerEvent::KeyboardResigned)
            .expect("resign");
        assert!(session.snapshot().show_emoji_searchbar);

        let outputs = session.apply(ComposerEvent::BackPressed).expect("back");
        assert_eq!(outputs, vec![ComposerOutput::BackHandled(true)]);
        assert!(!session.snapshot().show_emoji_searchbar);

        let outputs = session.apply(ComposerEvent::BackPressed).expect("back");
        assert_eq!(outputs, vec![ComposerOutput::BackHandled(false)]);
    }

    #[test]
    fn close_and_run_defers_only_when_keyboard_was_visible() {
        let mut session = ComposerSession::new();
        let outputs = session
            .apply(ComposerEvent::CloseEmojiKeyboardAndRun(ComposerAction::ChooseFile))
            .expect("close");
        assert_eq!(outputs, vec![ComposerOutput::RunAction(ComposerAction::ChooseFile)]);

        session
            .apply(ComposerEvent::OpenEmojiKeyboard)
            .expect("open");
        let outputs = session
            .apply(ComposerEvent::CloseEmojiKeyboardAndRun(ComposerAction::TakePhoto))
            .expect("close");
        assert!(outputs.is_empty());
        assert!(!session.snapshot().show_emoji_keyboard);

        let outputs = session
            .apply(ComposerEvent::RenderCompleted)
            .expect("flush");
        assert_eq!(outputs, vec![ComposerOutput::RunAction(ComposerAction::TakePhoto)]);
        assert_eq!(action_label(ComposerAction::TakePhoto), "take_photo");
    }

    #[test]
    fn send_emits_trimmed_body_and_resets_input() {
        let mut session = ComposerSession::new();
        assert!(session.apply(ComposerEvent::SendPressed).expect("send").is_empty());

        type_text(&mut session, "  hello  ");
        let outputs = session.apply(ComposerEvent::SendPressed).expect("send");
        match outputs.as_slice() {
            [
                ComposerOutput::SendMessage {
                    client_txn_id,
                    body,
                },
                ComposerOutput::SetInput { text, selection },
            ] => {
                assert!(!client_txn_id.is_empty());
                assert_eq!(body, "hello");
                assert_eq!(text, "");
                assert_eq!(*selection, Selection::caret(0));
            }
            other => panic!("unexpected outputs: {other:?}"),
        }
        assert_eq!(session.snapshot().mic_or_send, MicOrSend::Mic);
    }

    #[test]
    fn keyboard_metrics_feed_autocomplete_offset() {
        let mut session = ComposerSession::new();
        session
            .apply(ComposerEvent::KeyboardWillShow { height: 300.0 })
            .expect("show");
        session
            .apply(ComposerEvent::TrackingViewResized { height: 48.0 })
            .expect("resize");
        assert_eq!(session.snapshot().autocomplete_bottom_offset(), 398.0);

        session
            .apply(ComposerEvent::KeyboardWillHide)
            .expect("hide");
        assert_eq!(session.snapshot().autocomplete_bottom_offset(), 98.0);

        type_text(&mut session, "#ra");
        let snapshot = session.snapshot();
        assert!(snapshot.shows_autocomplete(2));
        assert!(!snapshot.shows_autocomplete(0));
    }

    #[test]
    fn rejects_out_of_bounds_selection() {
        let mut session = ComposerSession::new();
        type_text(&mut session, "abc");
        let err = session
            .apply(ComposerEvent::SelectionChanged(Selection::caret(10)))
            .expect_err("selection past end");
        assert!(matches!(err, EditError::InvalidSelection { .. }));
    }
}
