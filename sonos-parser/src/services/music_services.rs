//! Music service descriptor list parser
//!
//! Parses the `AvailableServiceDescriptorList` document returned by the
//! MusicServices `ListAvailableServices` action:
//!
//! ```xml
//! <Services SchemaVersion="1">
//!   <Service Id="9" Name="Spotify" Version="1.1" Uri="..." SecureUri="..."
//!            ContainerType="MService" Capabilities="513">
//!     <Policy Auth="DeviceLink" PollInterval="30"/>
//!     <Presentation>
//!       <Strings Version="1" Uri="..."/>
//!       <PresentationMap Version="2" Uri="..."/>
//!     </Presentation>
//!   </Service>
//! </Services>
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::xml_decode;
use crate::error::{ParseError, ParseResult};

/// How a music service authenticates a household.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MusicServiceAuth {
    Anonymous,
    DeviceLink,
    AppLink,
}

impl MusicServiceAuth {
    pub fn as_str(&self) -> &'static str {
        match self {
            MusicServiceAuth::Anonymous => "Anonymous",
            MusicServiceAuth::DeviceLink => "DeviceLink",
            MusicServiceAuth::AppLink => "AppLink",
        }
    }
}

impl fmt::Display for MusicServiceAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MusicServiceAuth {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Anonymous" => Ok(MusicServiceAuth::Anonymous),
            "DeviceLink" => Ok(MusicServiceAuth::DeviceLink),
            "AppLink" => Ok(MusicServiceAuth::AppLink),
            other => Err(ParseError::invalid_value("Policy/@Auth", other)),
        }
    }
}

/// A third-party music service available to the household.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicService {
    pub id: u32,
    pub name: String,
    pub version: String,
    pub uri: String,
    pub secure_uri: String,
    pub container_type: String,
    /// Raw capability bitmask as advertised by the service
    pub capabilities: u32,
    pub auth: MusicServiceAuth,
    /// Derived from `id`, never transmitted
    pub service_type: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub presentation_map_uri: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub manifest_uri: String,
}

/// The service type used in account descriptors (`SA_RINCON{type}_...`).
pub fn service_type_for_id(id: u32) -> String {
    (u64::from(id) * 256 + 7).to_string()
}

impl MusicService {
    pub fn has_capability(&self, bit: u32) -> bool {
        bit < 32 && self.capabilities & (1 << bit) != 0
    }

    /// The endpoint SMAPI calls go to: the secure URI when advertised.
    pub fn endpoint(&self) -> &str {
        if self.secure_uri.is_empty() {
            &self.uri
        } else {
            &self.secure_uri
        }
    }
}

#[derive(Debug, Deserialize)]
struct ServicesDocument {
    #[serde(rename = "Service", default)]
    services: Vec<RawService>,
}

#[derive(Debug, Deserialize)]
struct RawService {
    #[serde(rename = "@Id", default)]
    id: String,
    #[serde(rename = "@Name", default)]
    name: String,
    #[serde(rename = "@Version", default)]
    version: String,
    #[serde(rename = "@Uri", default)]
    uri: String,
    #[serde(rename = "@SecureUri", default)]
    secure_uri: String,
    #[serde(rename = "@ContainerType", default)]
    container_type: String,
    #[serde(rename = "@Capabilities", default)]
    capabilities: String,
    #[serde(rename = "Policy", default)]
    policy: Option<RawPolicy>,
    #[serde(rename = "Presentation", default)]
    presentation: Option<RawPresentation>,
    #[serde(rename = "Manifest", default)]
    manifest: Option<UriRef>,
}

#[derive(Debug, Deserialize)]
struct RawPolicy {
    #[serde(rename = "@Auth", default)]
    auth: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPresentation {
    #[serde(rename = "PresentationMap", default)]
    presentation_map: Option<UriRef>,
}

#[derive(Debug, Deserialize)]
struct UriRef {
    #[serde(rename = "@Uri", default)]
    uri: String,
}

impl TryFrom<RawService> for MusicService {
    type Error = ParseError;

    fn try_from(raw: RawService) -> Result<Self, Self::Error> {
        let id: u32 = raw
            .id
            .trim()
            .parse()
            .map_err(|_| ParseError::invalid_value("Service/@Id", raw.id.as_str()))?;

        let capabilities = match raw.capabilities.trim() {
            "" => 0,
            value => value
                .parse()
                .map_err(|_| ParseError::invalid_value("Service/@Capabilities", value))?,
        };

        let auth = raw
            .policy
            .and_then(|p| p.auth)
            .ok_or_else(|| {
                ParseError::MissingRequiredElement(format!("Policy/@Auth for service {}", id))
            })?
            .parse::<MusicServiceAuth>()?;

        Ok(MusicService {
            id,
            name: raw.name,
            version: raw.version,
            uri: raw.uri,
            secure_uri: raw.secure_uri,
            container_type: raw.container_type,
            capabilities,
            auth,
            service_type: service_type_for_id(id),
            presentation_map_uri: raw
                .presentation
                .and_then(|p| p.presentation_map)
                .map(|m| m.uri.trim().to_string())
                .unwrap_or_default(),
            manifest_uri: raw
                .manifest
                .map(|m| m.uri.trim().to_string())
                .unwrap_or_default(),
        })
    }
}

/// Parse a service descriptor list, preserving document order.
pub fn parse_service_descriptor_list(xml: &str) -> ParseResult<Vec<MusicService>> {
    let doc: ServicesDocument = xml_decode::parse(xml)?;
    doc.services.into_iter().map(MusicService::try_from).collect()
}
