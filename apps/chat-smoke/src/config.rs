//! Environment-backed runtime configuration for `chat-smoke`.

use std::{env, error::Error, fmt, path::PathBuf};

use media_cache::{ViewerContext, disk_store::DEFAULT_CAPACITY_BYTES};
use media_platform::AutoDownloadSettings;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_MEDIA_DIR: &str = "./.chat-smoke-store";

/// Runtime configuration used by the smoke app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokeConfig {
    /// Chat server base URL used to resolve relative attachment links.
    pub base_url: String,
    /// Viewing user's ID, appended to media links as `rc_uid`.
    pub user_id: Option<String>,
    /// Viewing user's auth token, appended to media links as `rc_token`.
    pub auth_token: Option<String>,
    /// Directory holding the on-disk media cache.
    pub media_dir: PathBuf,
    /// Media cache size cap before LRU eviction.
    pub media_cache_capacity_bytes: u64,
    pub auto_download: AutoDownloadSettings,
    /// Attachment link to fetch; the attachment run is skipped without it.
    pub attachment_link: Option<String>,
}

impl SmokeConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let base_url = optional_trimmed_env("CHAT_BASE_URL", &mut lookup)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "CHAT_BASE_URL",
                value: base_url,
                reason: "must be an http(s) URL".to_owned(),
            });
        }

        let user_id = optional_trimmed_env("CHAT_USER_ID", &mut lookup);
        let auth_token = optional_trimmed_env("CHAT_AUTH_TOKEN", &mut lookup);
        let media_dir = optional_trimmed_env("CHAT_MEDIA_DIR", &mut lookup)
            .map_or_else(|| PathBuf::from(DEFAULT_MEDIA_DIR), PathBuf::from);

        let media_cache_capacity_bytes = parse_optional_u64_with_default(
            "CHAT_MEDIA_CACHE_CAPACITY_BYTES",
            DEFAULT_CAPACITY_BYTES,
            &mut lookup,
        )?;
        if media_cache_capacity_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CHAT_MEDIA_CACHE_CAPACITY_BYTES",
                value: "0".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }

        let auto_download = AutoDownloadSettings {
            images: parse_optional_bool("CHAT_AUTO_DOWNLOAD_IMAGES", true, &mut lookup)?,
            video: parse_optional_bool("CHAT_AUTO_DOWNLOAD_VIDEO", false, &mut lookup)?,
            audio: parse_optional_bool("CHAT_AUTO_DOWNLOAD_AUDIO", false, &mut lookup)?,
        };
        let attachment_link = optional_trimmed_env("CHAT_ATTACHMENT_LINK", &mut lookup);

        Ok(Self {
            base_url,
            user_id,
            auth_token,
            media_dir,
            media_cache_capacity_bytes,
            auto_download,
            attachment_link,
        })
    }

    /// Identity used when resolving and authoring attachments.
    pub fn viewer(&self) -> ViewerContext {
        ViewerContext {
            user_id: self.user_id.clone().unwrap_or_default(),
            token: self.auth_token.clone().unwrap_or_default(),
            base_url: self.base_url.clone(),
        }
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { key, value, reason } => {
                write!(f, "invalid {key}='{value}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_optional_u64_with_default<F>(
    key: &'static str,
    default: u64,
    lookup: &mut F,
) -> Result<u64, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    value
        .trim()
        .parse::<u64>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value,
            reason: err.to_string(),
        })
}

fn parse_optional_bool<F>(key: &'static str, default: bool, lookup: &mut F) -> Result<bool, ConfigError>
where
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = lookup(key) else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "expected a boolean (true/false)".to_owned(),
        }),
    }
}
