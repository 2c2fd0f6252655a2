use soap_client::SoapClient;
use sonos_discovery::{Device, Topology};
use tracing::debug;

use crate::controller::ensure_coordinator;
use crate::error::ControlError;
use crate::operation::{SonosOperation, Validate, ValidationLevel};
use crate::Result;

/// A client for executing Sonos operations against actual devices
///
/// Bridges the stateless operation definitions and the SOAP transport.
/// Cloning is cheap; clones share one connection pool.
#[derive(Debug, Clone, Default)]
pub struct SonosClient {
    soap_client: SoapClient,
    validation: ValidationLevel,
}

impl SonosClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a Sonos client with a custom SOAP client (port, timeouts)
    pub fn with_soap_client(soap_client: SoapClient) -> Self {
        Self {
            soap_client,
            validation: ValidationLevel::default(),
        }
    }

    pub fn with_validation(mut self, level: ValidationLevel) -> Self {
        self.validation = level;
        self
    }

    pub fn soap_client(&self) -> &SoapClient {
        &self.soap_client
    }

    /// Execute a device-scoped Sonos operation against the speaker at `ip`
    ///
    /// The request is validated at the client's [`ValidationLevel`] before
    /// anything is sent. Group-scoped operations are refused with
    /// [`ControlError::GroupScoped`]; send those with [`Self::execute_on`].
    ///
    /// ```rust,no_run
    /// use sonos_api::SonosClient;
    /// use sonos_api::services::group_rendering_control::{get_group_volume, GetGroupVolumeOperation};
    /// use sonos_api::services::zone_group_topology::{get_zone_group_state, GetZoneGroupStateOperation};
    ///
    /// # async fn run() -> sonos_api::Result<()> {
    /// let client = SonosClient::new();
    /// let topology = client
    ///     .execute::<GetZoneGroupStateOperation>("192.168.1.100", &get_zone_group_state())
    ///     .await?
    ///     .topology()?;
    /// let living_room = topology.find_by_name("Living Room").expect("room exists");
    /// let volume = client
    ///     .execute_on::<GetGroupVolumeOperation>(&topology, living_room, &get_group_volume())
    ///     .await?;
    /// println!("group volume: {}", volume.current_volume);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute<Op: SonosOperation>(
        &self,
        ip: &str,
        request: &Op::Request,
    ) -> Result<Op::Response> {
        if Op::SERVICE.requires_coordinator() {
            return Err(ControlError::GroupScoped {
                action: Op::ACTION.to_string(),
            });
        }
        self.send::<Op>(ip, request).await
    }

    /// Execute a Sonos operation against `device`.
    ///
    /// Group-scoped operations are only sent when `device` coordinates its
    /// group in `topology`, otherwise [`ControlError::NotCoordinator`] is
    /// returned and nothing goes on the wire.
    pub async fn execute_on<Op: SonosOperation>(
        &self,
        topology: &Topology,
        device: &Device,
        request: &Op::Request,
    ) -> Result<Op::Response> {
        if Op::SERVICE.requires_coordinator() {
            ensure_coordinator(topology, device)?;
        }
        self.send::<Op>(&device.ip, request).await
    }

    async fn send<Op: SonosOperation>(&self, ip: &str, request: &Op::Request) -> Result<Op::Response> {
        request.validate(self.validation)?;
        let payload = Op::build_payload(request)?;
        let service_info = Op::SERVICE.info();
        debug!(%ip, service = Op::SERVICE.name(), action = Op::ACTION, "executing operation");

        let xml = self
            .soap_client
            .call(
                ip,
                service_info.endpoint,
                service_info.service_uri,
                Op::ACTION,
                &payload,
            )
            .await?;

        Op::parse_response(&xml)
    }
}
