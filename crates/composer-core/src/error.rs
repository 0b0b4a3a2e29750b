use thiserror::Error;

/// Errors raised by text-buffer edit operations.
///
/// These signal caller bugs (bad offsets), not user-recoverable conditions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    /// Range is reversed or reaches past the end of the buffer.
    #[error("invalid edit range {start}..{end} for buffer of {len} code units")]
    InvalidRange {
        start: usize,
        end: usize,
        len: usize,
    },
    /// Selection offsets reach past the end of the buffer.
    #[error("invalid selection {start}..{end} for buffer of {len} code units")]
    InvalidSelection {
        start: usize,
        end: usize,
        len: usize,
    },
}

impl EditError {
    /// Build a range error for `start..end` against a buffer of `len` units.
    pub fn invalid_range(start: usize, end: usize, len: usize) -> Self {
        Self::InvalidRange { start, end, len }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_range_in_message() {
        let err = EditError::invalid_range(4, 2, 3);
        assert_eq!(
            err.to_string(),
            "invalid edit range 4..2 for buffer of 3 code units"
        );
    }
}
