use serde::{Deserialize, Serialize};
use sonos_discovery::{Topology, TopologyError};
use xmltree::Element;

use crate::error::ControlError;
use crate::operation::{text_field, SonosOperation, Validate, ValidationError};
use crate::service::Service;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetZoneGroupStateOperationRequest;

impl Validate for GetZoneGroupStateOperationRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetZoneGroupStateResponse {
    /// Raw `ZoneGroupState` document
    pub zone_group_state: String,
}

impl GetZoneGroupStateResponse {
    pub fn topology(&self) -> Result<Topology, TopologyError> {
        Topology::from_xml(&self.zone_group_state)
    }
}

pub struct GetZoneGroupStateOperation;

impl SonosOperation for GetZoneGroupStateOperation {
    type Request = GetZoneGroupStateOperationRequest;
    type Response = GetZoneGroupStateResponse;

    const SERVICE: Service = Service::ZoneGroupTopology;
    const ACTION: &'static str = "GetZoneGroupState";

    fn build_payload(_request: &Self::Request) -> Result<String, ValidationError> {
        Ok(String::new())
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ControlError> {
        Ok(GetZoneGroupStateResponse {
            zone_group_state: text_field(xml, "ZoneGroupState")?,
        })
    }
}

pub fn get_zone_group_state() -> GetZoneGroupStateOperationRequest {
    GetZoneGroupStateOperationRequest
}
