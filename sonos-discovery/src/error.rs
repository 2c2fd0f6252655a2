//! Error types for discovery and topology resolution.

use soap_client::SoapError;
use sonos_parser::ParseError;
use thiserror::Error;

/// Failure to turn a bootstrap device into a household topology.
#[derive(Debug, Error)]
pub enum TopologyError {
    /// The bootstrap device did not answer
    #[error("device {ip} unreachable: {reason}")]
    Unreachable { ip: String, reason: String },

    /// The device answered with a SOAP fault or an unexpected status
    #[error("zone group state request failed: {0}")]
    Soap(SoapError),

    /// The zone group state could not be parsed
    #[error("invalid zone group state: {0}")]
    Parse(#[from] ParseError),

    /// The zone group state parsed but listed no usable devices
    #[error("zone group state lists no devices")]
    Empty,
}

impl From<SoapError> for TopologyError {
    fn from(error: SoapError) -> Self {
        match error {
            SoapError::Parse(msg) => TopologyError::Parse(ParseError::InvalidXmlStructure(msg)),
            other => TopologyError::Soap(other),
        }
    }
}

/// Error type for discovery operations.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Every stage ran and none produced a device
    #[error("no Sonos devices found")]
    NoDevices,

    /// The overall timeout budget ran out
    #[error("discovery timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The caller cancelled discovery
    #[error("discovery cancelled")]
    Cancelled,

    /// Socket or HTTP failure outside of topology resolution
    #[error("network error: {0}")]
    Network(String),

    /// Topology resolution failed on the final fallback stage
    #[error(transparent)]
    Topology(#[from] TopologyError),
}

impl DiscoveryError {
    /// Relative diagnostic value when several stages failed. Higher wins.
    pub(crate) fn weight(&self) -> u8 {
        match self {
            DiscoveryError::Topology(_) => 3,
            DiscoveryError::Network(_) => 2,
            DiscoveryError::NoDevices => 1,
            DiscoveryError::Timeout(_) | DiscoveryError::Cancelled => 0,
        }
    }
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;
