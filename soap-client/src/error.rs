//! Error types for the SOAP client

use thiserror::Error;

/// Errors that can occur during SOAP communication
#[derive(Debug, Error)]
pub enum SoapError {
    /// Network or HTTP communication error
    #[error("Network/HTTP error: {0}")]
    Network(String),

    /// Non-success HTTP status without a parseable SOAP fault
    #[error("HTTP status {0}")]
    Http(u16),

    /// XML parsing error
    #[error("XML parsing error: {0}")]
    Parse(String),

    /// SOAP fault returned by the device or service.
    ///
    /// `code` is the UPnP `errorCode` when present (500 otherwise), `reason`
    /// is the `faultstring` text, which SMAPI services use for their own
    /// error identifiers such as `NOT_LINKED_RETRY`.
    #[error("SOAP fault {code}: {reason}")]
    Fault { code: u16, reason: String },
}

impl SoapError {
    /// True when the request never produced a response (connect/read failure).
    pub fn is_network(&self) -> bool {
        matches!(self, SoapError::Network(_))
    }

    /// The fault string of a SOAP fault, if this is one.
    pub fn fault_reason(&self) -> Option<&str> {
        match self {
            SoapError::Fault { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }
}
