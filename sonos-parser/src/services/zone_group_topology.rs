//! ZoneGroupState parser
//!
//! Parses the document returned in the `ZoneGroupState` argument of
//! `GetZoneGroupState` (already unescaped by the SOAP layer). It carries the
//! household topology: groups, their coordinator, members and bonded
//! satellites.
//!
//! Current firmware wraps the groups in `<ZoneGroupState><ZoneGroups>`;
//! older firmware returns `<ZoneGroups>` as the root. Both are accepted.

use serde::{Deserialize, Serialize};

use crate::common::xml_decode;
use crate::error::{ParseError, ParseResult};

/// Decoded ZoneGroupState content.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ZoneGroupState {
    #[serde(rename = "ZoneGroups", default)]
    zone_groups: Option<ZoneGroups>,

    /// Groups found directly under the root (legacy `<ZoneGroups>` root)
    #[serde(rename = "ZoneGroup", default)]
    bare_groups: Vec<ZoneGroup>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
struct ZoneGroups {
    #[serde(rename = "ZoneGroup", default)]
    groups: Vec<ZoneGroup>,
}

/// A single zone group representing speakers playing together.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoneGroup {
    /// UUID of the coordinator member
    #[serde(rename = "@Coordinator", default)]
    pub coordinator: String,

    #[serde(rename = "@ID", default)]
    pub id: String,

    #[serde(rename = "ZoneGroupMember", default)]
    pub members: Vec<ZoneGroupMember>,
}

/// A speaker that is part of a zone group.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoneGroupMember {
    /// Unique identifier for this speaker (RINCON_...)
    #[serde(rename = "@UUID", default)]
    pub uuid: String,

    /// Device description URL, e.g. `http://192.168.4.40:1400/xml/device_description.xml`
    #[serde(rename = "@Location", default)]
    pub location: String,

    #[serde(rename = "@ZoneName", default)]
    pub zone_name: String,

    #[serde(rename = "@Icon", default)]
    pub icon: Option<String>,

    /// `1` for the hidden half of a stereo pair or a bonded sub
    #[serde(rename = "@Invisible", default)]
    pub invisible: Option<String>,

    /// `1` for BOOST/bridge devices that cannot play audio
    #[serde(rename = "@IsZoneBridge", default)]
    pub is_zone_bridge: Option<String>,

    #[serde(rename = "@HTSatChanMapSet", default)]
    pub ht_sat_chan_map_set: Option<String>,

    /// Home theater satellites bonded to this member
    #[serde(rename = "Satellite", default)]
    pub satellites: Vec<Satellite>,
}

/// A satellite speaker (part of a home theater setup).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Satellite {
    #[serde(rename = "@UUID", default)]
    pub uuid: String,

    #[serde(rename = "@Location", default)]
    pub location: String,

    #[serde(rename = "@ZoneName", default)]
    pub zone_name: String,

    #[serde(rename = "@Icon", default)]
    pub icon: Option<String>,

    #[serde(rename = "@Invisible", default)]
    pub invisible: Option<String>,
}

fn is_flag_set(value: &Option<String>) -> bool {
    matches!(value.as_deref().map(str::trim), Some("1" | "true"))
}

/// Extract the host part of a device location URL.
pub fn ip_from_location(location: &str) -> Option<&str> {
    let rest = location
        .strip_prefix("http://")
        .or_else(|| location.strip_prefix("https://"))?;
    let host = rest.split(['/', ':']).next()?;
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

impl ZoneGroupState {
    /// Parse a ZoneGroupState (or legacy ZoneGroups) document.
    pub fn from_xml(xml: &str) -> ParseResult<Self> {
        if xml.trim().is_empty() {
            return Err(ParseError::MissingRequiredElement("ZoneGroupState".to_string()));
        }
        xml_decode::parse(xml)
    }

    /// All zone groups, in document order.
    pub fn groups(&self) -> &[ZoneGroup] {
        match &self.zone_groups {
            Some(wrapped) if !wrapped.groups.is_empty() => &wrapped.groups,
            _ => &self.bare_groups,
        }
    }

    /// Find a zone group that contains a specific speaker UUID.
    pub fn find_group_containing_speaker(&self, speaker_uuid: &str) -> Option<&ZoneGroup> {
        self.groups().iter().find(|group| {
            group.members.iter().any(|member| {
                member.uuid == speaker_uuid
                    || member.satellites.iter().any(|sat| sat.uuid == speaker_uuid)
            })
        })
    }
}

impl ZoneGroup {
    /// Get the coordinator member details.
    pub fn coordinator_member(&self) -> Option<&ZoneGroupMember> {
        self.members
            .iter()
            .find(|member| member.uuid == self.coordinator)
    }
}

impl ZoneGroupMember {
    pub fn is_invisible(&self) -> bool {
        is_flag_set(&self.invisible)
    }

    pub fn is_zone_bridge(&self) -> bool {
        is_flag_set(&self.is_zone_bridge)
    }

    pub fn ip_address(&self) -> Option<&str> {
        ip_from_location(&self.location)
    }
}

impl Satellite {
    /// Satellites are hidden unless the device explicitly says otherwise.
    pub fn is_invisible(&self) -> bool {
        !matches!(self.invisible.as_deref().map(str::trim), Some("0" | "false"))
    }

    pub fn ip_address(&self) -> Option<&str> {
        ip_from_location(&self.location)
    }
}
