//! Info sections for the peer of a direct-message room.

use std::collections::BTreeMap;

/// Peer profile fields used by the room info screen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DirectPeer {
    pub roles: Vec<String>,
    /// Offset from UTC in hours; fractional for half-hour zones.
    pub utc_offset: Option<f32>,
    pub custom_fields: BTreeMap<String, String>,
}

/// One rendered section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InfoSection {
    Roles(Vec<String>),
    Timezone(String),
    CustomField { label: String, value: String },
}

/// Sections to show, in display order.
pub fn direct_sections(peer: &DirectPeer) -> Vec<InfoSection> {
    let mut sections = Vec::new();

    let roles: Vec<String> = peer
        .roles
        .iter()
        .map(|role| role.trim())
        .filter(|role| !role.is_empty())
        .map(str::to_owned)
        .collect();
    if !roles.is_empty() {
        sections.push(InfoSection::Roles(roles));
    }

    if let Some(offset) = peer.utc_offset {
        sections.push(InfoSection::Timezone(timezone_label(offset)));
    }

    sections.extend(
        peer.custom_fields
            .iter()
            .filter(|(_, value)| !value.trim().is_empty())
            .map(|(label, value)| InfoSection::CustomField {
                label: label.clone(),
                value: value.clone(),
            }),
    );

    sections
}

/// `UTC`, `UTC+3`, `UTC-5:30`.
pub fn timezone_label(utc_offset_hours: f32) -> String {
    let total_minutes = (utc_offset_hours * 60.0).round() as i32;
    if total_minutes == 0 {
        return "UTC".to_owned();
    }

    let sign = if total_minutes < 0 { '-' } else { '+' };
    let hours = total_minutes.abs() / 60;
    let minutes = total_minutes.abs() % 60;
    if minutes == 0 {
        format!("UTC{sign}{hours}")
    } else {
        format!("UTC{sign}{hours}:{minutes:02}")
    }
}
