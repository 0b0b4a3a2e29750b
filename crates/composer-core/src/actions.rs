//! App lifecycle actions and the reducer that consumes them.
//!
//! Actions serialize as `{"type": "APP_START", ...}` so they can cross a
//! host bridge unchanged.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Top-level navigation root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RootKind {
    #[default]
    Loading,
    Outside,
    Inside,
    SetUsername,
    #[serde(rename = "shareextension")]
    ShareExtension,
    #[serde(rename = "loadingshareextension")]
    LoadingShareExtension,
}

/// Network type reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InternetType {
    #[default]
    Unknown,
    None,
    Cellular,
    Wifi,
    Bluetooth,
    Ethernet,
    Wimax,
    Vpn,
    Other,
}

/// App-level intents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AppAction {
    #[serde(rename = "APP_START")]
    Start {
        root: RootKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    #[serde(rename = "APP_READY")]
    Ready,
    #[serde(rename = "APP_INIT")]
    Init,
    #[serde(rename = "APP_INIT_LOCAL_SETTINGS")]
    InitLocalSettings,
    #[serde(rename = "APP_SET_MASTER_DETAIL", rename_all = "camelCase")]
    SetMasterDetail { is_master_detail: bool },
    #[serde(rename = "APP_SET_NOTIFICATION_PRESENCE_CAP")]
    SetNotificationPresenceCap { show: bool },
    #[serde(rename = "APP_SET_INTERNET_TYPE", rename_all = "camelCase")]
    SetInternetType { internet_type: InternetType },
}

impl AppAction {
    pub fn start(root: RootKind) -> Self {
        Self::Start { root, text: None }
    }
}

/// App slice of the client state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub root: RootKind,
    /// Optional status text shown by the loading root.
    pub text: Option<String>,
    pub ready: bool,
    pub is_master_detail: bool,
    pub notification_presence_cap: bool,
    pub internet_type: InternetType,
    /// Set once local settings were loaded.
    pub local_settings_loaded: bool,
}

impl AppState {
    /// Apply one action.
    pub fn reduce(&mut self, action: &AppAction) {
        debug!(action = ?action, "reducing app action");
        match action {
            AppAction::Start { root, text } => {
                self.root = *root;
                self.text = text.clone();
            }
            AppAction::Ready => self.ready = true,
            AppAction::Init => self.ready = false,
            AppAction::InitLocalSettings => self.local_settings_loaded = true,
            AppAction::SetMasterDetail { is_master_detail } => {
                self.is_master_detail = *is_master_detail;
            }
            AppAction::SetNotificationPresenceCap { show } => {
                self.notification_presence_cap = *show;
            }
            AppAction::SetInternetType { internet_type } => self.internet_type = *internet_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn actions_serialize_with_type_tag() {
        let encoded = serde_json::to_value(AppAction::SetMasterDetail {
            is_master_detail: true,
        })
        .expect("action should serialize");
        assert_eq!(
            encoded,
            serde_json::json!({"type": "APP_SET_MASTER_DETAIL", "isMasterDetail": true})
        );

        let decoded: AppAction = serde_json::from_value(serde_json::json!({
            "type": "APP_START",
            "root": "shareextension",
        }))
        .expect("action should parse");
        assert_eq!(decoded, AppAction::start(RootKind::ShareExtension));

        let decoded: AppAction = serde_json::from_value(serde_json::json!({
            "type": "APP_SET_INTERNET_TYPE",
            "internetType": "wifi",
        }))
        .expect("action should parse");
        assert_eq!(
            decoded,
            AppAction::SetInternetType {
                internet_type: InternetType::Wifi
            }
        );
    }

    #[test]
    fn reducer_tracks_lifecycle() {
        let mut state = AppState::default();
        state.reduce(&AppAction::Start {
            root: RootKind::Inside,
            text: Some("Connecting".to_owned()),
        });
        state.reduce(&AppAction::Ready);
        state.reduce(&AppAction::InitLocalSettings);
        state.reduce(&AppAction::SetNotificationPresenceCap { show: true });

        assert_eq!(
            state,
            AppState {
                root: RootKind::Inside,
                text: Some("Connecting".to_owned()),
                ready: true,
                is_master_detail: false,
                notification_presence_cap: true,
                internet_type: InternetType::Unknown,
                local_settings_loaded: true,
            }
        );

        state.reduce(&AppAction::Init);
        assert!(!state.ready);
    }
}
