//! Topology Resolver
//!
//! Asks one speaker for the household's zone group state and turns it into
//! groups of [`Device`]s with their coordinator. Every speaker in a
//! household returns the same document, so one reachable device is enough.

use serde::Serialize;
use soap_client::{SoapClient, SoapError};
use sonos_parser::{ZoneGroupMember, ZoneGroupState};
use tracing::{debug, warn};

use crate::device::{device_set, prefer_device_set, Device, DeviceSet};
use crate::error::TopologyError;
use crate::ssdp::SsdpResponse;

pub const ZONE_GROUP_TOPOLOGY_ENDPOINT: &str = "ZoneGroupTopology/Control";
pub const ZONE_GROUP_TOPOLOGY_SERVICE: &str = "urn:schemas-upnp-org:service:ZoneGroupTopology:1";

/// How many distinct SSDP responders are asked before giving up
const MAX_CANDIDATES: usize = 3;

/// One zone group: a coordinator plus the speakers playing with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ZoneGroupInfo {
    pub id: String,
    /// UDN of the coordinator
    pub coordinator: String,
    /// Members in document order, satellites right after their main unit
    pub members: Vec<Device>,
}

impl ZoneGroupInfo {
    pub fn coordinator_device(&self) -> Option<&Device> {
        self.members.iter().find(|d| d.udn == self.coordinator)
    }

    pub fn contains(&self, udn: &str) -> bool {
        self.members.iter().any(|d| d.udn == udn)
    }
}

/// The household as reported by one speaker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Topology {
    pub groups: Vec<ZoneGroupInfo>,
}

fn member_device(member: &ZoneGroupMember) -> Option<Device> {
    let ip = member.ip_address()?;
    Some(Device {
        ip: ip.to_string(),
        name: member.zone_name.clone(),
        udn: member.uuid.clone(),
        icon: member.icon.clone(),
        invisible: member.is_invisible(),
    })
}

impl Topology {
    /// Build the topology from a parsed zone group state.
    ///
    /// Zone bridges are dropped since they cannot play audio. Fails with
    /// [`TopologyError::Empty`] when nothing usable remains.
    pub fn from_zone_group_state(state: &ZoneGroupState) -> Result<Self, TopologyError> {
        let mut groups = Vec::new();

        for group in state.groups() {
            let mut members = Vec::new();
            for member in &group.members {
                if member.is_zone_bridge() {
                    continue;
                }
                match member_device(member) {
                    Some(device) => members.push(device),
                    None => warn!(uuid = %member.uuid, location = %member.location, "Skipping member without usable location"),
                }
                for satellite in &member.satellites {
                    if let Some(ip) = satellite.ip_address() {
                        members.push(Device {
                            ip: ip.to_string(),
                            name: satellite.zone_name.clone(),
                            udn: satellite.uuid.clone(),
                            icon: satellite.icon.clone(),
                            invisible: satellite.is_invisible(),
                        });
                    }
                }
            }
            if !members.is_empty() {
                groups.push(ZoneGroupInfo {
                    id: group.id.clone(),
                    coordinator: group.coordinator.clone(),
                    members,
                });
            }
        }

        if groups.is_empty() {
            return Err(TopologyError::Empty);
        }
        Ok(Topology { groups })
    }

    /// Parse a raw `ZoneGroupState` document.
    pub fn from_xml(xml: &str) -> Result<Self, TopologyError> {
        let state = ZoneGroupState::from_xml(xml)?;
        Self::from_zone_group_state(&state)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.groups.iter().flat_map(|g| g.members.iter())
    }

    /// Devices keyed by UDN; invisible ones only when asked for.
    pub fn device_set(&self, include_invisible: bool) -> DeviceSet {
        device_set(
            self.devices()
                .filter(|d| include_invisible || !d.invisible)
                .cloned(),
        )
    }

    /// First device in document order whose zone name matches exactly.
    ///
    /// A bonded set shares one zone name; its main unit is listed before
    /// its satellites, so the main unit is the one found.
    pub fn find_by_name(&self, name: &str) -> Option<&Device> {
        self.devices().find(|d| d.name == name)
    }

    pub fn find_by_ip(&self, ip: &str) -> Option<&Device> {
        self.devices().find(|d| d.ip == ip)
    }

    pub fn group_of(&self, udn: &str) -> Option<&ZoneGroupInfo> {
        self.groups.iter().find(|g| g.contains(udn))
    }

    /// The coordinator of the group `udn` belongs to.
    pub fn coordinator_for(&self, udn: &str) -> Option<&Device> {
        self.group_of(udn).and_then(ZoneGroupInfo::coordinator_device)
    }
}

/// Query `ip` for the household topology.
pub async fn fetch_topology(soap: &SoapClient, ip: &str) -> Result<Topology, TopologyError> {
    let response = soap
        .call(
            ip,
            ZONE_GROUP_TOPOLOGY_ENDPOINT,
            ZONE_GROUP_TOPOLOGY_SERVICE,
            "GetZoneGroupState",
            "",
        )
        .await
        .map_err(|e| match e {
            SoapError::Network(reason) => TopologyError::Unreachable {
                ip: ip.to_string(),
                reason,
            },
            other => TopologyError::from(other),
        })?;

    let xml = soap_client::child_text(&response, "ZoneGroupState").ok_or_else(|| {
        TopologyError::Parse(sonos_parser::ParseError::MissingRequiredElement(
            "ZoneGroupState".to_string(),
        ))
    })?;
    let topology = Topology::from_xml(&xml)?;
    debug!(%ip, groups = topology.groups.len(), "Resolved topology");
    Ok(topology)
}

/// Resolve the device set from a single bootstrap IP.
pub async fn topology_from_ip(
    soap: &SoapClient,
    ip: &str,
    include_invisible: bool,
) -> Result<DeviceSet, TopologyError> {
    let set = fetch_topology(soap, ip).await?.device_set(include_invisible);
    if set.is_empty() {
        return Err(TopologyError::Empty);
    }
    Ok(set)
}

/// Resolve the device set from SSDP responders, asking up to three distinct
/// hosts and merging their answers with [`prefer_device_set`].
pub async fn topology_from_candidates(
    soap: &SoapClient,
    candidates: &[SsdpResponse],
    include_invisible: bool,
) -> Result<DeviceSet, TopologyError> {
    let mut ips: Vec<&str> = Vec::new();
    for ip in candidates.iter().filter_map(SsdpResponse::ip) {
        if !ips.contains(&ip) {
            ips.push(ip);
        }
        if ips.len() == MAX_CANDIDATES {
            break;
        }
    }

    let mut best = DeviceSet::new();
    let mut last_error = None;
    for ip in ips {
        match topology_from_ip(soap, ip, include_invisible).await {
            Ok(set) => best = prefer_device_set(best, set),
            Err(e) => {
                warn!(%ip, error = %e, "Topology from SSDP candidate failed");
                last_error = Some(e);
            }
        }
    }

    if !best.is_empty() {
        return Ok(best);
    }
    Err(last_error.unwrap_or(TopologyError::Empty))
}
