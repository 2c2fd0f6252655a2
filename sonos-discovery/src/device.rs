//! Device model, device sets and the device description document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A Sonos speaker as seen by one discovery run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// IP address the device answered on
    pub ip: String,
    /// Zone (room) name
    pub name: String,
    /// Unique device name, e.g. `RINCON_000E58A0123456`. Empty when unknown.
    pub udn: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub icon: Option<String>,
    /// Bonded satellites and hidden stereo-pair halves
    #[serde(default)]
    pub invisible: bool,
}

impl Device {
    /// Identity used as the [`DeviceSet`] key: the UDN, or the IP when the
    /// UDN is unknown.
    pub fn key(&self) -> &str {
        if self.udn.is_empty() {
            &self.ip
        } else {
            &self.udn
        }
    }
}

/// Devices keyed by [`Device::key`]. Iteration order is stable.
pub type DeviceSet = BTreeMap<String, Device>;

/// Collect devices into a [`DeviceSet`]. Later duplicates do not replace
/// earlier ones.
pub fn device_set<I>(devices: I) -> DeviceSet
where
    I: IntoIterator<Item = Device>,
{
    let mut set = DeviceSet::new();
    for device in devices {
        set.entry(device.key().to_string()).or_insert(device);
    }
    set
}

/// Choose between the best set so far and a new candidate set.
///
/// - an empty candidate leaves `best` untouched
/// - a strictly larger candidate replaces `best`
/// - an equally sized candidate only contributes keys `best` lacks
/// - a smaller candidate is ignored
pub fn prefer_device_set(best: DeviceSet, candidate: DeviceSet) -> DeviceSet {
    if candidate.is_empty() {
        return best;
    }
    if candidate.len() > best.len() {
        return candidate;
    }
    if candidate.len() < best.len() {
        return best;
    }

    let mut merged = best;
    for (key, device) in candidate {
        merged.entry(key).or_insert(device);
    }
    merged
}

/// UPnP device description root element
/// (`http://{ip}:1400/xml/device_description.xml`).
#[derive(Debug, Deserialize)]
pub struct DescriptionRoot {
    pub device: DeviceDescription,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDescription {
    pub device_type: String,
    #[serde(default)]
    pub friendly_name: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model_name: String,
    #[serde(rename = "UDN", default)]
    pub udn: String,
    pub room_name: Option<String>,
}

impl DeviceDescription {
    pub fn from_xml(xml: &str) -> std::result::Result<Self, quick_xml::DeError> {
        let root: DescriptionRoot = quick_xml::de::from_str(xml)?;
        Ok(root.device)
    }

    /// Validates by manufacturer name and device type.
    pub fn is_sonos_device(&self) -> bool {
        self.manufacturer.to_lowercase().contains("sonos")
            || self.device_type.contains("ZonePlayer")
    }

    /// UDN without the `uuid:` prefix, matching zone group state member ids
    pub fn rincon_id(&self) -> &str {
        self.udn.strip_prefix("uuid:").unwrap_or(&self.udn)
    }
}
