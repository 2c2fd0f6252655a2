//! Music Service Registry
//!
//! Lists the music services a household can use (as reported by any of its
//! speakers) and fetches their presentation maps.

use sonos_api::services::device_properties::{get_household_id, GetHouseholdIDOperation};
use sonos_api::services::music_services::{list_available_services, ListAvailableServicesOperation};
use sonos_api::SonosClient;
use sonos_parser::{parse_presentation_map_xml, MusicService, PresentationMap};
use tracing::debug;

use crate::error::{Result, SmapiError};

/// Presentation maps larger than this are refused
pub const MAX_PRESENTATION_MAP_BYTES: usize = 4 << 20;

#[derive(Debug, Clone, Default)]
pub struct MusicServiceRegistry {
    client: SonosClient,
}

impl MusicServiceRegistry {
    pub fn new(client: SonosClient) -> Self {
        Self { client }
    }

    /// Every service available to the household `ip` belongs to.
    pub async fn list(&self, ip: &str) -> Result<Vec<MusicService>> {
        let response = self
            .client
            .execute::<ListAvailableServicesOperation>(ip, &list_available_services())
            .await?;
        let services = response.services()?;
        debug!(%ip, count = services.len(), "Listed music services");
        Ok(services)
    }

    /// List and pick one service by name (case-insensitive) or numeric id.
    pub async fn find(&self, ip: &str, name_or_id: &str) -> Result<MusicService> {
        let services = self.list(ip).await?;
        find_service(&services, name_or_id)
            .cloned()
            .ok_or_else(|| SmapiError::UnknownService(name_or_id.to_string()))
    }

    /// Household id of the speaker at `ip`, the key linked accounts are
    /// stored under.
    pub async fn household_id(&self, ip: &str) -> Result<String> {
        let response = self
            .client
            .execute::<GetHouseholdIDOperation>(ip, &get_household_id())
            .await?;
        Ok(response.household_id)
    }

    /// Download and parse a service's presentation map.
    ///
    /// Services that advertise no map have no search categories, which
    /// yields an empty map.
    pub async fn presentation_map(&self, service: &MusicService) -> Result<PresentationMap> {
        if service.presentation_map_uri.is_empty() {
            debug!(service = %service.name, "No presentation map advertised");
            return Ok(PresentationMap::new());
        }
        let body = fetch_capped(
            self.client.soap_client().http(),
            &service.presentation_map_uri,
            MAX_PRESENTATION_MAP_BYTES,
        )
        .await?;
        Ok(parse_presentation_map_xml(&body)?)
    }
}

/// Exact id match first, then case-insensitive name.
pub fn find_service<'a>(services: &'a [MusicService], name_or_id: &str) -> Option<&'a MusicService> {
    let wanted = name_or_id.trim();
    if let Ok(id) = wanted.parse::<u32>() {
        if let Some(service) = services.iter().find(|s| s.id == id) {
            return Some(service);
        }
    }
    services.iter().find(|s| s.name.eq_ignore_ascii_case(wanted))
}

/// GET `url`, failing on non-2xx statuses and on bodies over `limit` bytes.
async fn fetch_capped(http: &reqwest::Client, url: &str, limit: usize) -> Result<String> {
    let mut response = http.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SmapiError::Http(format!("{} returned {}", url, status)));
    }
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(SmapiError::TooLarge { limit });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(SmapiError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&body).into_owned())
}
