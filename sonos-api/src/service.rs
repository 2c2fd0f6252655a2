/// The UPnP services a Sonos speaker exposes that this crate talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// AVTransport service - playback and the queue
    AVTransport,

    /// GroupRenderingControl service - group-wide volume and mute
    GroupRenderingControl,

    /// ZoneGroupTopology service - household grouping
    ZoneGroupTopology,

    /// ContentDirectory service - browsing favorites, queues and libraries
    ContentDirectory,

    /// DeviceProperties service - per-device identity such as the household id
    DeviceProperties,

    /// MusicServices service - the catalogue of available music services
    MusicServices,
}

/// Endpoint and service URI of a UPnP service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Control path relative to the device base URL
    pub endpoint: &'static str,

    /// The UPnP service URI used in SOAP requests
    pub service_uri: &'static str,
}

impl Service {
    pub fn name(&self) -> &'static str {
        match self {
            Service::AVTransport => "AVTransport",
            Service::GroupRenderingControl => "GroupRenderingControl",
            Service::ZoneGroupTopology => "ZoneGroupTopology",
            Service::ContentDirectory => "ContentDirectory",
            Service::DeviceProperties => "DeviceProperties",
            Service::MusicServices => "MusicServices",
        }
    }

    pub fn info(&self) -> ServiceInfo {
        match self {
            Service::AVTransport => ServiceInfo {
                endpoint: "MediaRenderer/AVTransport/Control",
                service_uri: "urn:schemas-upnp-org:service:AVTransport:1",
            },
            Service::GroupRenderingControl => ServiceInfo {
                endpoint: "MediaRenderer/GroupRenderingControl/Control",
                service_uri: "urn:schemas-upnp-org:service:GroupRenderingControl:1",
            },
            Service::ZoneGroupTopology => ServiceInfo {
                endpoint: "ZoneGroupTopology/Control",
                service_uri: "urn:schemas-upnp-org:service:ZoneGroupTopology:1",
            },
            Service::ContentDirectory => ServiceInfo {
                endpoint: "MediaServer/ContentDirectory/Control",
                service_uri: "urn:schemas-upnp-org:service:ContentDirectory:1",
            },
            Service::DeviceProperties => ServiceInfo {
                endpoint: "DeviceProperties/Control",
                service_uri: "urn:schemas-upnp-org:service:DeviceProperties:1",
            },
            Service::MusicServices => ServiceInfo {
                endpoint: "MusicServices/Control",
                service_uri: "urn:schemas-upnp-org:service:MusicServices:1",
            },
        }
    }

    /// Services whose actions act on the whole group and must be sent to the
    /// group coordinator.
    pub fn requires_coordinator(&self) -> bool {
        matches!(self, Service::AVTransport | Service::GroupRenderingControl)
    }
}
