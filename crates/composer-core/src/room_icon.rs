//! Room-type icon selection for room lists and headers.

use serde::{Deserialize, Serialize};

const DEFAULT_ICON_SIZE: u16 = 16;

/// Room kind as encoded by the server (`t` field).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomType {
    /// `d`
    Direct,
    /// `c`
    PublicChannel,
    /// `p`
    PrivateGroup,
    /// `l`
    Livechat,
    /// `discussion`
    Discussion,
    /// Anything else the server sends.
    Other(String),
}

impl RoomType {
    /// Parse the wire value; an empty string means "no type".
    pub fn parse(raw: &str) -> Option<Self> {
        let room_type = match raw {
            "" => return None,
            "d" => Self::Direct,
            "c" => Self::PublicChannel,
            "p" => Self::PrivateGroup,
            "l" => Self::Livechat,
            "discussion" => Self::Discussion,
            other => Self::Other(other.to_owned()),
        };
        Some(room_type)
    }
}

/// Presence status shown on direct-message avatars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UserStatus {
    Online,
    Away,
    Busy,
    #[default]
    Offline,
}

/// Icon font glyphs used for room types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomGlyph {
    ChannelPrivate,
    ChannelPublic,
    Teams,
    TeamsPrivate,
    Discussions,
    Message,
}

impl RoomGlyph {
    /// Icon font name.
    pub fn name(self) -> &'static str {
        match self {
            Self::ChannelPrivate => "channel-private",
            Self::ChannelPublic => "channel-public",
            Self::Teams => "teams",
            Self::TeamsPrivate => "teams-private",
            Self::Discussions => "discussions",
            Self::Message => "message",
        }
    }
}

/// Inputs for icon selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RoomIconRequest {
    pub user_id: Option<String>,
    pub room_type: Option<RoomType>,
    pub is_group_chat: bool,
    pub team_main: bool,
    pub status: Option<UserStatus>,
    pub size: Option<u16>,
    /// Omnichannel source type for livechat rooms (`widget`, `email`, ...).
    pub source_type: Option<String>,
}

/// What to draw for a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomIcon {
    /// Presence indicator for the other user of a 1:1 room.
    Status {
        user_id: String,
        status: UserStatus,
        size: u16,
    },
    /// Livechat icon, tinted by status and source.
    Omnichannel {
        status: Option<UserStatus>,
        source_type: Option<String>,
        size: u16,
    },
    /// Plain glyph.
    Glyph { glyph: RoomGlyph, size: u16 },
}

/// Pick the icon for a room; `None` when the room has no type.
pub fn room_type_icon(request: &RoomIconRequest) -> Option<RoomIcon> {
    let room_type = request.room_type.as_ref()?;
    let size = request.size.unwrap_or(DEFAULT_ICON_SIZE);

    if *room_type == RoomType::Direct
        && !request.is_group_chat
        && let Some(user_id) = &request.user_id
    {
        return Some(RoomIcon::Status {
            user_id: user_id.clone(),
            status: request.status.unwrap_or_default(),
            size,
        });
    }

    if *room_type == RoomType::Livechat {
        return Some(RoomIcon::Omnichannel {
            status: request.status,
            source_type: request.source_type.clone(),
            size,
        });
    }

    let glyph = if request.team_main {
        if *room_type == RoomType::PrivateGroup {
            RoomGlyph::TeamsPrivate
        } else {
            RoomGlyph::Teams
        }
    } else {
        match room_type {
            RoomType::Discussion => RoomGlyph::Discussions,
            RoomType::PublicChannel => RoomGlyph::ChannelPublic,
            RoomType::Direct if request.is_group_chat => RoomGlyph::Message,
            _ => RoomGlyph::ChannelPrivate,
        }
    };
    Some(RoomIcon::Glyph { glyph, size })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(room_type: &str) -> RoomIconRequest {
        RoomIconRequest {
            room_type: RoomType::parse(room_type),
            ..RoomIconRequest::default()
        }
    }

    fn glyph_of(request: &RoomIconRequest) -> RoomGlyph {
        match room_type_icon(request) {
            Some(RoomIcon::Glyph { glyph, .. }) => glyph,
            other => panic!("expected glyph, got {other:?}"),
        }
    }

    #[test]
    fn no_type_renders_nothing() {
        assert_eq!(room_type_icon(&request("")), None);
    }

    #[test]
    fn direct_room_with_user_shows_status_defaulting_to_offline() {
        let icon = room_type_icon(&RoomIconRequest {
            user_id: Some("u1".to_owned()),
            ..request("d")
        });
        assert_eq!(
            icon,
            Some(RoomIcon::Status {
                user_id: "u1".to_owned(),
                status: UserStatus::Offline,
                size: 16,
            })
        );
    }

    #[test]
    fn livechat_uses_omnichannel_icon() {
        let icon = room_type_icon(&RoomIconRequest {
            status: Some(UserStatus::Online),
            source_type: Some("widget".to_owned()),
            size: Some(24),
            ..request("l")
        });
        assert_eq!(
            icon,
            Some(RoomIcon::Omnichannel {
                status: Some(UserStatus::Online),
                source_type: Some("widget".to_owned()),
                size: 24,
            })
        );
    }

    #[test]
    fn glyph_selection_follows_room_kind() {
        assert_eq!(glyph_of(&request("c")), RoomGlyph::ChannelPublic);
        assert_eq!(glyph_of(&request("p")), RoomGlyph::ChannelPrivate);
        assert_eq!(glyph_of(&request("discussion")), RoomGlyph::Discussions);
        assert_eq!(glyph_of(&request("d")), RoomGlyph::ChannelPrivate);
        assert_eq!(
            glyph_of(&RoomIconRequest {
                is_group_chat: true,
                user_id: Some("u1".to_owned()),
                ..request("d")
            }),
            RoomGlyph::Message
        );
        assert_eq!(
            glyph_of(&RoomIconRequest {
                team_main: true,
                ..request("p")
            }),
            RoomGlyph::TeamsPrivate
        );
        assert_eq!(
            glyph_of(&RoomIconRequest {
                team_main: true,
                ..request("c")
            })
            .name(),
            "teams"
        );
    }
}
