use serde::{Deserialize, Serialize};
use xmltree::Element;

use crate::error::ControlError;
use crate::operation::{text_field, SonosOperation, Validate, ValidationError};
use crate::service::Service;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetHouseholdIDOperationRequest;

impl Validate for GetHouseholdIDOperationRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetHouseholdIDResponse {
    /// e.g. `Sonos_AbCdEf0123456789`
    pub household_id: String,
}

pub struct GetHouseholdIDOperation;

impl SonosOperation for GetHouseholdIDOperation {
    type Request = GetHouseholdIDOperationRequest;
    type Response = GetHouseholdIDResponse;

    const SERVICE: Service = Service::DeviceProperties;
    const ACTION: &'static str = "GetHouseholdID";

    fn build_payload(_request: &Self::Request) -> Result<String, ValidationError> {
        Ok(String::new())
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ControlError> {
        let household_id = text_field(xml, "CurrentHouseholdID")?;
        if household_id.is_empty() {
            return Err(ControlError::Parse("Empty CurrentHouseholdID".to_string()));
        }
        Ok(GetHouseholdIDResponse { household_id })
    }
}

pub fn get_household_id() -> GetHouseholdIDOperationRequest {
    GetHouseholdIDOperationRequest
}
