use std::fmt;

use serde::{Deserialize, Serialize};
use xmltree::Element;

use crate::error::ControlError;
use crate::operation::{arg, parse_field, SonosOperation, Validate, ValidationError};
use crate::service::Service;

/// Transport URI that plays the coordinator's own queue.
pub fn queue_uri(coordinator_udn: &str) -> String {
    format!("x-rincon-queue:{}#0", coordinator_udn)
}

// =============================================================================
// ADD URI TO QUEUE
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddURIToQueueOperationRequest {
    pub instance_id: u32,
    pub enqueued_uri: String,
    pub enqueued_uri_meta_data: String,
    /// 0 appends, otherwise the 1-based position to insert at
    pub desired_first_track_number_enqueued: u32,
    pub enqueue_as_next: bool,
}

impl Validate for AddURIToQueueOperationRequest {
    fn validate_boundary(&self) -> Result<(), ValidationError> {
        if self.enqueued_uri.trim().is_empty() {
            return Err(ValidationError::missing("enqueued_uri"));
        }
        Ok(())
    }

    fn validate_comprehensive(&self) -> Result<(), ValidationError> {
        self.validate_boundary()?;
        if !self.enqueued_uri.contains(':') {
            return Err(ValidationError::invalid_value(
                "enqueued_uri",
                &self.enqueued_uri,
                "expected a scheme-prefixed URI",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddURIToQueueResponse {
    /// 1-based queue position of the first added track
    pub first_track_number_enqueued: u32,
    pub num_tracks_added: u32,
    pub new_queue_length: u32,
}

pub struct AddURIToQueueOperation;

impl SonosOperation for AddURIToQueueOperation {
    type Request = AddURIToQueueOperationRequest;
    type Response = AddURIToQueueResponse;

    const SERVICE: Service = Service::AVTransport;
    const ACTION: &'static str = "AddURIToQueue";

    fn build_payload(request: &Self::Request) -> Result<String, ValidationError> {
        Ok([
            arg("InstanceID", request.instance_id),
            arg("EnqueuedURI", &request.enqueued_uri),
            arg("EnqueuedURIMetaData", &request.enqueued_uri_meta_data),
            arg(
                "DesiredFirstTrackNumberEnqueued",
                request.desired_first_track_number_enqueued,
            ),
            arg("EnqueueAsNext", if request.enqueue_as_next { "1" } else { "0" }),
        ]
        .concat())
    }

    fn parse_response(xml: &Element) -> Result<Self::Response, ControlError> {
        Ok(AddURIToQueueResponse {
            first_track_number_enqueued: parse_field(xml, "FirstTrackNumberEnqueued")?,
            num_tracks_added: parse_field(xml, "NumTracksAdded")?,
            new_queue_length: parse_field(xml, "NewQueueLength")?,
        })
    }
}

pub fn add_uri_to_queue(
    enqueued_uri: impl Into<String>,
    enqueued_uri_meta_data: impl Into<String>,
    enqueue_as_next: bool,
) -> AddURIToQueueOperationRequest {
    AddURIToQueueOperationRequest {
        instance_id: 0,
        enqueued_uri: enqueued_uri.into(),
        enqueued_uri_meta_data: enqueued_uri_meta_data.into(),
        desired_first_track_number_enqueued: 0,
        enqueue_as_next,
    }
}

// =============================================================================
// SET AV TRANSPORT URI
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAVTransportURIOperationRequest {
    pub instance_id: u32,
    pub current_uri: String,
    pub current_uri_meta_data: String,
}

impl Validate for SetAVTransportURIOperationRequest {
    fn validate_boundary(&self) -> Result<(), ValidationError> {
        if self.current_uri.trim().is_empty() {
            return Err(ValidationError::missing("current_uri"));
        }
        Ok(())
    }
}

pub struct SetAVTransportURIOperation;

impl SonosOperation for SetAVTransportURIOperation {
    type Request = SetAVTransportURIOperationRequest;
    type Response = ();

    const SERVICE: Service = Service::AVTransport;
    const ACTION: &'static str = "SetAVTransportURI";

    fn build_payload(request: &Self::Request) -> Result<String, ValidationError> {
        Ok([
            arg("InstanceID", request.instance_id),
            arg("CurrentURI", &request.current_uri),
            arg("CurrentURIMetaData", &request.current_uri_meta_data),
        ]
        .concat())
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ControlError> {
        Ok(())
    }
}

pub fn set_av_transport_uri(
    current_uri: impl Into<String>,
    current_uri_meta_data: impl Into<String>,
) -> SetAVTransportURIOperationRequest {
    SetAVTransportURIOperationRequest {
        instance_id: 0,
        current_uri: current_uri.into(),
        current_uri_meta_data: current_uri_meta_data.into(),
    }
}

// =============================================================================
// SEEK
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeekUnit {
    /// Jump to a 1-based queue position
    #[serde(rename = "TRACK_NR")]
    TrackNr,
    /// Position within the current track, `H:MM:SS`
    #[serde(rename = "REL_TIME")]
    RelTime,
}

impl fmt::Display for SeekUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeekUnit::TrackNr => f.write_str("TRACK_NR"),
            SeekUnit::RelTime => f.write_str("REL_TIME"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeekOperationRequest {
    pub instance_id: u32,
    pub unit: SeekUnit,
    pub target: String,
}

impl Validate for SeekOperationRequest {
    fn validate_boundary(&self) -> Result<(), ValidationError> {
        if self.target.is_empty() {
            return Err(ValidationError::missing("target"));
        }
        if self.unit == SeekUnit::TrackNr {
            match self.target.parse::<u32>() {
                Ok(n) if n >= 1 => {}
                _ => {
                    return Err(ValidationError::invalid_value(
                        "target",
                        &self.target,
                        "track number must be a positive integer",
                    ))
                }
            }
        }
        Ok(())
    }

    fn validate_comprehensive(&self) -> Result<(), ValidationError> {
        self.validate_boundary()?;
        if self.unit == SeekUnit::RelTime {
            let parts: Vec<&str> = self.target.split(':').collect();
            let well_formed = parts.len() == 3
                && parts
                    .iter()
                    .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
            if !well_formed {
                return Err(ValidationError::invalid_value(
                    "target",
                    &self.target,
                    "expected H:MM:SS",
                ));
            }
        }
        Ok(())
    }
}

pub struct SeekOperation;

impl SonosOperation for SeekOperation {
    type Request = SeekOperationRequest;
    type Response = ();

    const SERVICE: Service = Service::AVTransport;
    const ACTION: &'static str = "Seek";

    fn build_payload(request: &Self::Request) -> Result<String, ValidationError> {
        Ok([
            arg("InstanceID", request.instance_id),
            arg("Unit", request.unit),
            arg("Target", &request.target),
        ]
        .concat())
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ControlError> {
        Ok(())
    }
}

pub fn seek_track(track_number: u32) -> SeekOperationRequest {
    SeekOperationRequest {
        instance_id: 0,
        unit: SeekUnit::TrackNr,
        target: track_number.to_string(),
    }
}

// =============================================================================
// PLAY
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayOperationRequest {
    pub instance_id: u32,
    pub speed: String,
}

impl Default for PlayOperationRequest {
    fn default() -> Self {
        Self {
            instance_id: 0,
            speed: "1".to_string(),
        }
    }
}

impl Validate for PlayOperationRequest {
    fn validate_boundary(&self) -> Result<(), ValidationError> {
        if self.speed != "1" {
            return Err(ValidationError::invalid_value(
                "speed",
                &self.speed,
                "only normal speed is supported",
            ));
        }
        Ok(())
    }
}

pub struct PlayOperation;

impl SonosOperation for PlayOperation {
    type Request = PlayOperationRequest;
    type Response = ();

    const SERVICE: Service = Service::AVTransport;
    const ACTION: &'static str = "Play";

    fn build_payload(request: &Self::Request) -> Result<String, ValidationError> {
        Ok(format!(
            "{}{}",
            arg("InstanceID", request.instance_id),
            arg("Speed", &request.speed)
        ))
    }

    fn parse_response(_xml: &Element) -> Result<Self::Response, ControlError> {
        Ok(())
    }
}

pub fn play() -> PlayOperationRequest {
    PlayOperationRequest::default()
}
