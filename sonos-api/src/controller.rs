//! Group Control Client
//!
//! A [`GroupController`] is bound to the coordinator of one zone group.
//! Targets given by IP or by room name are resolved through the household
//! topology and redirected to their coordinator, so group-scoped actions
//! never reach a satellite or a plain member.

use std::fmt;
use std::net::IpAddr;

use soap_client::SoapError;
use sonos_discovery::{
    CancellationToken, DefaultStrategies, Device, DiscoverOptions, Discoverer, DiscoveryError,
    DiscoveryStrategies, Topology, TopologyError, ZoneGroupInfo,
};
use sonos_parser::{favorite_uri, DidlItem};
use tracing::{debug, info, warn};

use crate::client::SonosClient;
use crate::error::{ControlError, Result};
use crate::operation::SonosOperation;
use crate::reference::{ReferenceTranslator, SpotifyTranslator};
use crate::services::av_transport::{
    add_uri_to_queue, play, queue_uri, seek_track, set_av_transport_uri, AddURIToQueueOperation,
    AddURIToQueueResponse, PlayOperation, SeekOperation, SetAVTransportURIOperation,
};
use crate::services::content_directory::{browse_children, BrowseOperation, FAVORITES_OBJECT_ID};
use crate::services::group_rendering_control::{
    get_group_mute, get_group_volume, set_group_mute, set_group_volume, GetGroupMuteOperation,
    GetGroupVolumeOperation, SetGroupMuteOperation, SetGroupVolumeOperation,
};
use crate::services::zone_group_topology::{get_zone_group_state, GetZoneGroupStateOperation};

/// Page size used when browsing favorites
const BROWSE_PAGE: u32 = 100;

/// What the caller wants to control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// A speaker's IP address
    Ip(String),
    /// A room name, matched exactly
    Name(String),
}

impl Target {
    /// IP addresses become [`Target::Ip`], anything else is a room name.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.parse::<IpAddr>().is_ok() {
            Target::Ip(value.to_string())
        } else {
            Target::Name(value.to_string())
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Ip(ip) => f.write_str(ip),
            Target::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    /// Queue right after the current track and start playing it
    pub play_now: bool,
}

/// The coordinator of `target`'s group within `topology`.
pub fn resolve_coordinator<'a>(topology: &'a Topology, target: &Target) -> Result<&'a Device> {
    let device = match target {
        Target::Ip(ip) => topology.find_by_ip(ip),
        Target::Name(name) => topology.find_by_name(name),
    }
    .ok_or_else(|| ControlError::TargetNotFound(target.to_string()))?;

    let coordinator = topology
        .coordinator_for(&device.udn)
        .ok_or_else(|| ControlError::TargetNotFound(target.to_string()))?;
    if coordinator.udn != device.udn {
        debug!(target = %target, coordinator = %coordinator.name, "Redirecting to group coordinator");
    }
    Ok(coordinator)
}

/// The group `device` coordinates in `topology`.
pub fn ensure_coordinator<'a>(topology: &'a Topology, device: &Device) -> Result<&'a ZoneGroupInfo> {
    let group = topology
        .group_of(&device.udn)
        .ok_or_else(|| ControlError::TargetNotFound(device.name.clone()))?;
    if group.coordinator != device.udn {
        let coordinator = group
            .coordinator_device()
            .map(|d| d.name.clone())
            .unwrap_or_else(|| group.coordinator.clone());
        return Err(ControlError::NotCoordinator {
            device: device.name.clone(),
            coordinator,
        });
    }
    Ok(group)
}

/// Group-scoped control bound to one coordinator.
#[derive(Debug, Clone)]
pub struct GroupController {
    client: SonosClient,
    topology: Topology,
    coordinator: Device,
    group_id: String,
}

impl GroupController {
    /// Bind to `device`, which must coordinate its group in `topology`.
    pub fn for_coordinator(client: SonosClient, topology: &Topology, device: &Device) -> Result<Self> {
        let group_id = ensure_coordinator(topology, device)?.id.clone();
        Ok(Self {
            client,
            topology: topology.clone(),
            coordinator: device.clone(),
            group_id,
        })
    }

    /// Resolve `target` with network discovery and bind to its coordinator.
    pub async fn connect(client: SonosClient, target: &Target) -> Result<Self> {
        let discoverer =
            Discoverer::new(DefaultStrategies::new(client.soap_client().clone()));
        Self::connect_with(
            client,
            target,
            &discoverer,
            &CancellationToken::new(),
            &DiscoverOptions::default(),
        )
        .await
    }

    /// Resolve `target` and bind to its coordinator.
    ///
    /// An IP target is asked for the topology directly; a name target first
    /// discovers the household and asks any reachable speaker.
    pub async fn connect_with<S: DiscoveryStrategies>(
        client: SonosClient,
        target: &Target,
        discoverer: &Discoverer<S>,
        cancel: &CancellationToken,
        options: &DiscoverOptions,
    ) -> Result<Self> {
        let topology = match target {
            Target::Ip(ip) => topology_from(&client, ip).await?,
            Target::Name(_) => {
                let devices = discoverer.discover(cancel, options).await?;
                household_topology(&client, devices.values()).await?
            }
        };

        let coordinator = resolve_coordinator(&topology, target)?.clone();
        Self::for_coordinator(client, &topology, &coordinator)
    }

    pub fn coordinator(&self) -> &Device {
        &self.coordinator
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// The household topology the controller was bound with
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    async fn execute<Op: SonosOperation>(&self, request: &Op::Request) -> Result<Op::Response> {
        self.client
            .execute_on::<Op>(&self.topology, &self.coordinator, request)
            .await
    }

    pub async fn group_volume(&self) -> Result<u8> {
        let response = self
            .execute::<GetGroupVolumeOperation>(&get_group_volume())
            .await?;
        Ok(response.current_volume)
    }

    /// Set the group volume (0-100). Out of range values are rejected
    /// before anything is sent.
    pub async fn set_group_volume(&self, volume: u8) -> Result<()> {
        self.execute::<SetGroupVolumeOperation>(&set_group_volume(volume))
            .await
    }

    pub async fn group_mute(&self) -> Result<bool> {
        let response = self
            .execute::<GetGroupMuteOperation>(&get_group_mute())
            .await?;
        Ok(response.current_mute)
    }

    pub async fn set_group_mute(&self, mute: bool) -> Result<()> {
        self.execute::<SetGroupMuteOperation>(&set_group_mute(mute))
            .await
    }

    /// Flip the group mute state and return the new state.
    pub async fn toggle_group_mute(&self) -> Result<bool> {
        let mute = !self.group_mute().await?;
        self.set_group_mute(mute).await?;
        Ok(mute)
    }

    /// Queue a Spotify track, album or playlist through the default
    /// Spotify account.
    pub async fn enqueue_spotify(
        &self,
        reference: &str,
        options: EnqueueOptions,
    ) -> Result<AddURIToQueueResponse> {
        self.enqueue(&SpotifyTranslator::default(), reference, options)
            .await
    }

    /// Translate `reference` and add it to the queue.
    ///
    /// With `play_now` the item is queued next and playback starts from it.
    /// Adding and playing are separate actions: when playback fails the item
    /// stays queued and [`ControlError::EnqueuedButNotPlayed`] is returned.
    pub async fn enqueue(
        &self,
        translator: &dyn ReferenceTranslator,
        reference: &str,
        options: EnqueueOptions,
    ) -> Result<AddURIToQueueResponse> {
        if !translator.recognizes(reference) {
            return Err(ControlError::UnsupportedReference(reference.to_string()));
        }
        let translated = translator.translate(reference)?;

        let request = add_uri_to_queue(
            translated.uri.as_str(),
            translated.metadata_xml(),
            options.play_now,
        );
        let queued = self.execute::<AddURIToQueueOperation>(&request).await?;
        info!(
            service = translator.service_name(),
            position = queued.first_track_number_enqueued,
            tracks = queued.num_tracks_added,
            "Enqueued"
        );

        if options.play_now {
            self.play_from_queue(queued.first_track_number_enqueued)
                .await?;
        }
        Ok(queued)
    }

    /// Switch the transport to the queue, jump to `position` and play.
    async fn play_from_queue(&self, position: u32) -> Result<()> {
        let result = async {
            self.execute::<SetAVTransportURIOperation>(&set_av_transport_uri(
                queue_uri(&self.coordinator.udn),
                "",
            ))
            .await?;
            self.execute::<SeekOperation>(&seek_track(position)).await?;
            self.execute::<PlayOperation>(&play()).await
        }
        .await;

        result.map_err(|e| {
            warn!(position, error = %e, "Queued item could not be played");
            ControlError::EnqueuedButNotPlayed {
                position,
                source: Box::new(e),
            }
        })
    }

    /// The household's Sonos Favorites, in display order.
    pub async fn favorites(&self) -> Result<Vec<DidlItem>> {
        let mut items = Vec::new();
        loop {
            let request = browse_children(FAVORITES_OBJECT_ID, items.len() as u32, BROWSE_PAGE);
            let page = self.execute::<BrowseOperation>(&request).await?;
            let returned = page.items()?;
            let done = returned.is_empty()
                || page.number_returned == 0
                || items.len() + returned.len() >= page.total_matches as usize;
            items.extend(returned);
            if done {
                break;
            }
        }
        Ok(items)
    }

    /// Start playing a favorite.
    ///
    /// Streams and tracks replace the current transport; containers such as
    /// playlists are queued next and played from the queue.
    pub async fn play_favorite(&self, favorite: &DidlItem) -> Result<()> {
        let uri = favorite_uri(favorite);
        if uri.is_empty() {
            return Err(ControlError::Unplayable(favorite.title.clone()));
        }
        let metadata = favorite
            .res_md
            .clone()
            .filter(|md| !md.trim().is_empty())
            .unwrap_or_else(|| favorite.to_didl_xml());

        if uri.starts_with("x-rincon-cpcontainer:") {
            let queued = self
                .execute::<AddURIToQueueOperation>(&add_uri_to_queue(uri, metadata, true))
                .await?;
            return self.play_from_queue(queued.first_track_number_enqueued).await;
        }

        self.execute::<SetAVTransportURIOperation>(&set_av_transport_uri(uri, metadata))
            .await?;
        self.execute::<PlayOperation>(&play()).await
    }
}

/// Ask the speaker at `ip` for the household topology.
async fn topology_from(client: &SonosClient, ip: &str) -> Result<Topology> {
    let response = client
        .execute::<GetZoneGroupStateOperation>(ip, &get_zone_group_state())
        .await
        .map_err(|e| match e {
            ControlError::Soap(SoapError::Network(reason)) => ControlError::Topology(
                TopologyError::Unreachable {
                    ip: ip.to_string(),
                    reason,
                },
            ),
            other => other,
        })?;
    let topology = response.topology()?;
    debug!(%ip, groups = topology.groups.len(), "Resolved topology");
    Ok(topology)
}

/// Ask each discovered speaker in turn until one returns the topology.
async fn household_topology<'a, I>(client: &SonosClient, devices: I) -> Result<Topology>
where
    I: IntoIterator<Item = &'a Device>,
{
    let mut last_error = None;
    for device in devices {
        match topology_from(client, &device.ip).await {
            Ok(topology) => return Ok(topology),
            Err(e) => {
                warn!(ip = %device.ip, error = %e, "Topology request failed");
                last_error = Some(e);
            }
        }
    }
    match last_error {
        Some(e) => Err(e),
        None => Err(DiscoveryError::NoDevices.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATE: &str = r#"<ZoneGroupState><ZoneGroups><ZoneGroup Coordinator="RINCON_LR" ID="RINCON_LR:12"><ZoneGroupMember UUID="RINCON_LR" Location="http://10.0.0.20:1400/xml/device_description.xml" ZoneName="Living Room"><Satellite UUID="RINCON_SUB" Location="http://10.0.0.21:1400/xml/device_description.xml" ZoneName="Living Room" Invisible="1"/></ZoneGroupMember><ZoneGroupMember UUID="RINCON_K" Location="http://10.0.0.22:1400/xml/device_description.xml" ZoneName="Kitchen"/></ZoneGroup><ZoneGroup Coordinator="RINCON_O" ID="RINCON_O:3"><ZoneGroupMember UUID="RINCON_O" Location="http://10.0.0.30:1400/xml/device_description.xml" ZoneName="Office"/></ZoneGroup></ZoneGroups></ZoneGroupState>"#;

    fn topology() -> Topology {
        Topology::from_xml(STATE).unwrap()
    }

    #[test]
    fn test_target_parse() {
        assert_eq!(Target::parse("10.0.0.20"), Target::Ip("10.0.0.20".to_string()));
        assert_eq!(Target::parse(" Kitchen "), Target::Name("Kitchen".to_string()));
    }

    #[test]
    fn test_member_name_resolves_to_coordinator() {
        let topology = topology();
        let coordinator =
            resolve_coordinator(&topology, &Target::Name("Kitchen".to_string())).unwrap();
        assert_eq!(coordinator.udn, "RINCON_LR");
        assert_eq!(coordinator.ip, "10.0.0.20");
    }

    #[test]
    fn test_satellite_ip_resolves_to_coordinator() {
        let topology = topology();
        let coordinator =
            resolve_coordinator(&topology, &Target::Ip("10.0.0.21".to_string())).unwrap();
        assert_eq!(coordinator.udn, "RINCON_LR");
    }

    #[test]
    fn test_name_match_is_case_sensitive() {
        let topology = topology();
        let err = resolve_coordinator(&topology, &Target::Name("kitchen".to_string())).unwrap_err();
        assert!(matches!(err, ControlError::TargetNotFound(name) if name == "kitchen"));
    }

    #[test]
    fn test_for_coordinator_rejects_members() {
        let topology = topology();
        let kitchen = topology.find_by_name("Kitchen").unwrap().clone();
        let err = GroupController::for_coordinator(SonosClient::new(), &topology, &kitchen)
            .unwrap_err();
        match err {
            ControlError::NotCoordinator { device, coordinator } => {
                assert_eq!(device, "Kitchen");
                assert_eq!(coordinator, "Living Room");
            }
            other => panic!("expected NotCoordinator, got {:?}", other),
        }

        let office = topology.find_by_name("Office").unwrap().clone();
        let controller =
            GroupController::for_coordinator(SonosClient::new(), &topology, &office).unwrap();
        assert_eq!(controller.group_id(), "RINCON_O:3");
    }

    #[tokio::test]
    async fn test_unsupported_reference_fails_before_network() {
        let topology = topology();
        let office = topology.find_by_name("Office").unwrap().clone();
        let controller =
            GroupController::for_coordinator(SonosClient::new(), &topology, &office).unwrap();
        let err = controller
            .enqueue_spotify("https://example.com/song", EnqueueOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::UnsupportedReference(_)));
    }

    #[tokio::test]
    async fn test_unplayable_favorite_is_refused() {
        let topology = topology();
        let office = topology.find_by_name("Office").unwrap().clone();
        let controller =
            GroupController::for_coordinator(SonosClient::new(), &topology, &office).unwrap();
        let favorite = DidlItem {
            title: "Broken".to_string(),
            ..DidlItem::default()
        };
        let err = controller.play_favorite(&favorite).await.unwrap_err();
        assert!(matches!(err, ControlError::Unplayable(title) if title == "Broken"));
    }
}
