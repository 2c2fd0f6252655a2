use serde::{Deserialize, Serialize};
use xmltree::Element;

use crate::error::ControlError;
use crate::operation::{arg, parse_bool_field, parse_field, SonosOperation, Validate, ValidationError};
use crate::service::Service;

pub const MAX_VOLUME: u8 = 100;

// =============================================================================
// GET GROUP VOLUME
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetGroupVolumeOperationRequest {
    pub instance_id: u32,
}

impl Validate for GetGroupVolumeOperationRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetGroupVolumeResponse {
    pub current_volume: u8,
}

pub struct GetGroupVolumeOperation;

impl SonosOperation for GetGroupVolumeOperation {
    type Request = GetGroupVolumeOperationRequest;
    type Response = GetGroupVolumeResponse;

    const SERVICE: Service = Service::GroupRenderingControl;
    const ACTION: &'static str = "GetGroupVolume";

    fn build_payload(request: &Self::Request) -> Result<String, ValidationError> {
        Ok(arg("InstanceID", request.instance_id))
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ControlError> {
        Ok(GetGroupVolumeResponse {
            current_volume: parse_field(xml, "CurrentVolume")?,
        })
    }
}

pub fn get_group_volume() -> GetGroupVolumeOperationRequest {
    GetGroupVolumeOperationRequest::default()
}

// =============================================================================
// SET GROUP VOLUME
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetGroupVolumeOperationRequest {
    pub instance_id: u32,
    pub desired_volume: u8,
}

impl Validate for SetGroupVolumeOperationRequest {
    fn validate_boundary(&self) -> Result<(), ValidationError> {
        if self.desired_volume > MAX_VOLUME {
            return Err(ValidationError::range_error(
                "desired_volume",
                0,
                MAX_VOLUME,
                self.desired_volume,
            ));
        }
        Ok(())
    }
}

pub struct SetGroupVolumeOperation;

impl SonosOperation for SetGroupVolumeOperation {
    type Request = SetGroupVolumeOperationRequest;
    type Response = ();

    const SERVICE: Service = Service::GroupRenderingControl;
    const ACTION: &'static str = "SetGroupVolume";

    fn build_payload(request: &Self::Request) -> Result<String, ValidationError> {
        Ok(format!(
            "{}{}",
            arg("InstanceID", request.instance_id),
            arg("DesiredVolume", request.desired_volume)
        ))
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ControlError> {
        Ok(())
    }
}

pub fn set_group_volume(desired_volume: u8) -> SetGroupVolumeOperationRequest {
    SetGroupVolumeOperationRequest {
        instance_id: 0,
        desired_volume,
    }
}

// =============================================================================
// GET GROUP MUTE
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetGroupMuteOperationRequest {
    pub instance_id: u32,
}

impl Validate for GetGroupMuteOperationRequest {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetGroupMuteResponse {
    pub current_mute: bool,
}

pub struct GetGroupMuteOperation;

impl SonosOperation for GetGroupMuteOperation {
    type Request = GetGroupMuteOperationRequest;
    type Response = GetGroupMuteResponse;

    const SERVICE: Service = Service::GroupRenderingControl;
    const ACTION: &'static str = "GetGroupMute";

    fn build_payload(request: &Self::Request) -> Result<String, ValidationError> {
        Ok(arg("InstanceID", request.instance_id))
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ControlError> {
        Ok(GetGroupMuteResponse {
            current_mute: parse_bool_field(xml, "CurrentMute")?,
        })
    }
}

pub fn get_group_mute() -> GetGroupMuteOperationRequest {
    GetGroupMuteOperationRequest::default()
}

// =============================================================================
// SET GROUP MUTE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetGroupMuteOperationRequest {
    pub instance_id: u32,
    pub desired_mute: bool,
}

impl Validate for SetGroupMuteOperationRequest {}

pub struct SetGroupMuteOperation;

impl SonosOperation for SetGroupMuteOperation {
    type Request = SetGroupMuteOperationRequest;
    type Response = ();

    const SERVICE: Service = Service::GroupRenderingControl;
    const ACTION: &'static str = "SetGroupMute";

    fn build_payload(request: &Self::Request) -> Result<String, ValidationError> {
        Ok(format!(
            "{}{}",
            arg("InstanceID", request.instance_id),
            arg("DesiredMute", if request.desired_mute { "1" } else { "0" })
        ))
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ControlError> {
        Ok(())
    }
}

pub fn set_group_mute(desired_mute: bool) -> SetGroupMuteOperationRequest {
    SetGroupMuteOperationRequest {
        instance_id: 0,
        desired_mute,
    }
}
