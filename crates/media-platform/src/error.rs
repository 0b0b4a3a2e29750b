use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Broad error category used for logging and display decisions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaErrorCategory {
    /// Invalid input, unsupported media or other configuration issue.
    Config,
    /// Authentication/authorization failure on the media server.
    Auth,
    /// Transient network or transport failure.
    Network,
    /// Rate-limited by the media server.
    RateLimited,
    /// Local file or cache index failure.
    Storage,
    /// Transfer cancelled by the user.
    Cancelled,
    /// Internal bug or invariant break.
    Internal,
}

/// Stable media error payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[error("{category:?}:{code}: {message}")]
pub struct MediaError {
    /// High-level error category.
    pub category: MediaErrorCategory,
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

impl MediaError {
    /// Construct a new media error.
    pub fn new(
        category: MediaErrorCategory,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build a standard invalid-state-transition error.
    pub fn invalid_state(current: impl std::fmt::Debug, action: impl Into<String>) -> Self {
        let action = action.into();
        Self::new(
            MediaErrorCategory::Internal,
            "invalid_state_transition",
            format!("cannot run '{action}' while attachment is in state {current:?}"),
        )
    }

    /// Error reported when a transfer stops because it was cancelled.
    pub fn cancelled(url: &str) -> Self {
        Self::new(
            MediaErrorCategory::Cancelled,
            "download_cancelled",
            format!("download of {url} was cancelled"),
        )
    }

    /// Wrap a local I/O failure.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::new(MediaErrorCategory::Storage, "storage_failure", err.to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        self.category == MediaErrorCategory::Cancelled
    }
}

/// Map HTTP status codes to media error categories.
pub fn classify_http_status(status: u16) -> MediaErrorCategory {
    match status {
        401 | 403 => MediaErrorCategory::Auth,
        408 | 429 => MediaErrorCategory::RateLimited,
        400..=499 => MediaErrorCategory::Config,
        500..=599 => MediaErrorCategory::Network,
        _ => MediaErrorCategory::Internal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_http_status_categories() {
        assert_eq!(classify_http_status(401), MediaErrorCategory::Auth);
        assert_eq!(classify_http_status(429), MediaErrorCategory::RateLimited);
        assert_eq!(classify_http_status(404), MediaErrorCategory::Config);
        assert_eq!(classify_http_status(503), MediaErrorCategory::Network);
        assert_eq!(classify_http_status(700), MediaErrorCategory::Internal);
    }

    #[test]
    fn keeps_invalid_state_error_code_stable() {
        let err = MediaError::invalid_state("Cached", "start_download");
        assert_eq!(err.code, "invalid_state_transition");
        assert_eq!(err.category, MediaErrorCategory::Internal);
    }

    #[test]
    fn cancelled_errors_are_recognisable() {
        assert!(MediaError::cancelled("https://chat.example.org/a.png").is_cancelled());
        assert!(!MediaError::storage("disk full").is_cancelled());
    }
}
