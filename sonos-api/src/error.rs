use soap_client::SoapError;
use sonos_discovery::{DiscoveryError, TopologyError};
use sonos_parser::ParseError;
use thiserror::Error;

use crate::operation::ValidationError;

/// Errors from controlling a speaker or a group
#[derive(Debug, Error)]
pub enum ControlError {
    /// The SOAP action failed: unreachable device, HTTP error or a fault
    /// returned by the speaker.
    #[error("SOAP action failed: {0}")]
    Soap(SoapError),

    /// The speaker answered but the response did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// A request argument was rejected before anything was sent
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// No device in the household matches the requested name or IP
    #[error("no speaker matches '{0}'")]
    TargetNotFound(String),

    /// A group-scoped action was aimed at a device that does not coordinate
    /// its group.
    #[error("{device} is not the coordinator of its group (coordinator is {coordinator})")]
    NotCoordinator { device: String, coordinator: String },

    /// A group-scoped action was sent by IP alone, with no topology to
    /// check the coordinator against.
    #[error("{action} is group-scoped and must be sent through the group coordinator")]
    GroupScoped { action: String },

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// No reference translator recognizes the reference
    #[error("unsupported reference: {0}")]
    UnsupportedReference(String),

    /// The favorite has no resolvable URI
    #[error("favorite '{0}' has no playable URI")]
    Unplayable(String),

    /// The item was added to the queue but starting playback failed. The
    /// queue entry stays in place.
    #[error("queued at position {position} but playback failed: {source}")]
    EnqueuedButNotPlayed {
        position: u32,
        source: Box<ControlError>,
    },
}

pub type Result<T> = std::result::Result<T, ControlError>;

impl From<SoapError> for ControlError {
    fn from(error: SoapError) -> Self {
        match error {
            SoapError::Parse(msg) => ControlError::Parse(msg),
            other => ControlError::Soap(other),
        }
    }
}

impl From<ParseError> for ControlError {
    fn from(error: ParseError) -> Self {
        ControlError::Parse(error.to_string())
    }
}

impl From<ValidationError> for ControlError {
    fn from(validation_error: ValidationError) -> Self {
        match validation_error {
            ValidationError::InvalidValue {
                parameter,
                value,
                reason,
            } => ControlError::InvalidParameter(format!(
                "Invalid value '{}' for parameter '{}': {}",
                value, parameter, reason
            )),
            ValidationError::RangeError {
                parameter,
                value,
                min,
                max,
            } => ControlError::InvalidParameter(format!(
                "Parameter '{}' value {} is out of range [{}, {}]",
                parameter, value, min, max
            )),
            ValidationError::MissingParameter { parameter } => ControlError::InvalidParameter(
                format!("Required parameter '{}' is missing", parameter),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soap_error_conversion() {
        let err: ControlError = SoapError::Network("connection timeout".to_string()).into();
        assert!(matches!(err, ControlError::Soap(SoapError::Network(_))));

        let err: ControlError = SoapError::Parse("invalid XML".to_string()).into();
        assert!(matches!(err, ControlError::Parse(_)));

        let err: ControlError = SoapError::Fault {
            code: 701,
            reason: "UPnPError".to_string(),
        }
        .into();
        assert!(matches!(err, ControlError::Soap(SoapError::Fault { code: 701, .. })));
    }

    #[test]
    fn test_validation_error_conversion() {
        let err: ControlError = ValidationError::range_error("DesiredVolume", 0, 100, 150).into();
        assert_eq!(
            err.to_string(),
            "Invalid parameter: Parameter 'DesiredVolume' value 150 is out of range [0, 100]"
        );
    }

    #[test]
    fn test_partial_success_is_distinct() {
        let err = ControlError::EnqueuedButNotPlayed {
            position: 4,
            source: Box::new(ControlError::Soap(SoapError::Http(500))),
        };
        assert_eq!(
            err.to_string(),
            "queued at position 4 but playback failed: SOAP action failed: HTTP status 500"
        );
        assert!(std::error::Error::source(&err).is_some());
    }
}
