use serde::{Deserialize, Serialize};
use sonos_parser::{parse_service_descriptor_list, MusicService, ParseResult};
use xmltree::Element;

use crate::error::ControlError;
use crate::operation::{text_field, SonosOperation, Validate, ValidationError};
use crate::service::Service;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListAvailableServicesOperationRequest;

impl Validate for ListAvailableServicesOperationRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListAvailableServicesResponse {
    /// `<Services>` document describing every available service
    pub descriptor_list: String,
    /// Comma separated service types the household has enabled
    pub service_type_list: String,
    pub list_version: String,
}

impl ListAvailableServicesResponse {
    pub fn services(&self) -> ParseResult<Vec<MusicService>> {
        parse_service_descriptor_list(&self.descriptor_list)
    }

    pub fn service_types(&self) -> Vec<&str> {
        self.service_type_list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

pub struct ListAvailableServicesOperation;

impl SonosOperation for ListAvailableServicesOperation {
    type Request = ListAvailableServicesOperationRequest;
    type Response = ListAvailableServicesResponse;

    const SERVICE: Service = Service::MusicServices;
    const ACTION: &'static str = "ListAvailableServices";

    fn build_payload(_request: &Self::Request) -> Result<String, ValidationError> {
        Ok(String::new())
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ControlError> {
        Ok(ListAvailableServicesResponse {
            descriptor_list: text_field(xml, "AvailableServiceDescriptorList")?,
            service_type_list: text_field(xml, "AvailableServiceTypeList").unwrap_or_default(),
            list_version: text_field(xml, "AvailableServiceListVersion").unwrap_or_default(),
        })
    }
}

pub fn list_available_services() -> ListAvailableServicesOperationRequest {
    ListAvailableServicesOperationRequest
}
