//! UTF-16 text buffer with selection, mutated only through `replace`.
//!
//! Offsets are code units, matching what native text inputs report for
//! selection ranges. A supplementary-plane character (most emoji) is two
//! units wide.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::EditError;

/// Selection range in code units. `start` may be greater than `end` when the
/// user selected backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    /// Collapsed selection at `offset`.
    pub fn caret(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Edit cursor: the larger end of the selection.
    pub fn cursor(&self) -> usize {
        self.start.max(self.end)
    }
}

/// Composer text plus selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextBuffer {
    units: Vec<u16>,
    selection: Selection,
}

impl TextBuffer {
    /// Buffer holding `text` with the caret at its end.
    pub fn new(text: &str) -> Self {
        let units: Vec<u16> = text.encode_utf16().collect();
        let selection = Selection::caret(units.len());
        Self { units, selection }
    }

    /// Buffer holding `text` with an explicit selection.
    pub fn with_selection(text: &str, selection: Selection) -> Result<Self, EditError> {
        Self::from_units(text.encode_utf16().collect(), selection)
    }

    pub(crate) fn from_units(units: Vec<u16>, selection: Selection) -> Result<Self, EditError> {
        let len = units.len();
        if selection.start > len || selection.end > len {
            return Err(EditError::InvalidSelection {
                start: selection.start,
                end: selection.end,
                len,
            });
        }
        Ok(Self { units, selection })
    }

    /// Buffer contents. Unpaired surrogates render as U+FFFD.
    pub fn text(&self) -> String {
        String::from_utf16_lossy(&self.units)
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Length in code units.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn cursor(&self) -> usize {
        self.selection.cursor()
    }

    /// Same text, new selection.
    pub fn select(&self, selection: Selection) -> Result<Self, EditError> {
        Self::from_units(self.units.clone(), selection)
    }

    /// Replace `range` with `insertion`; the caret lands after the insertion.
    pub fn replace(&self, range: Range<usize>, insertion: &str) -> Result<Self, EditError> {
        let insertion: Vec<u16> = insertion.encode_utf16().collect();
        self.replace_units(range, &insertion)
    }

    /// Replace `range` with `insertion` and apply a caller-chosen selection.
    pub fn replace_with_selection(
        &self,
        range: Range<usize>,
        insertion: &str,
        selection: Selection,
    ) -> Result<Self, EditError> {
        let insertion: Vec<u16> = insertion.encode_utf16().collect();
        let edited = self.splice(range, &insertion)?;
        Self::from_units(edited, selection)
    }

    pub(crate) fn replace_units(
        &self,
        range: Range<usize>,
        insertion: &[u16],
    ) -> Result<Self, EditError> {
        let caret = range.start + insertion.len();
        let edited = self.splice(range, insertion)?;
        Ok(Self {
            units: edited,
            selection: Selection::caret(caret),
        })
    }

    fn splice(&self, range: Range<usize>, insertion: &[u16]) -> Result<Vec<u16>, EditError> {
        let len = self.units.len();
        if range.start > range.end || range.end > len {
            return Err(EditError::invalid_range(range.start, range.end, len));
        }

        let mut edited = Vec::with_capacity(len - (range.end - range.start) + insertion.len());
        edited.extend_from_slice(&self.units[..range.start]);
        edited.extend_from_slice(insertion);
        edited.extend_from_slice(&self.units[range.end..]);
        Ok(edited)
    }
}

/// Length of `text` in UTF-16 code units.
pub fn utf16_len(text: &str) -> usize {
    text.encode_utf16().count()
}
