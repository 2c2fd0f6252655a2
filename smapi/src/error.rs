//! Error types for the music service layer.

use std::path::PathBuf;

use soap_client::SoapError;
use sonos_api::ControlError;
use sonos_parser::ParseError;
use thiserror::Error;

/// Token persistence failures
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("token store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("token store is not valid JSON: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The file ended up readable or writable by others
    #[error("{path} has mode {mode:o}, expected owner-only access")]
    Permissions { path: PathBuf, mode: u32 },

    /// No path was given and no config directory is known
    #[error("no location for the token store")]
    NoPath,
}

/// Account linking failures
#[derive(Debug, Error)]
pub enum AuthError {
    /// Anonymous services have nothing to link
    #[error("{0} does not require account linking")]
    NotRequired(String),

    /// The service offers a linking mode this client cannot drive
    #[error("unsupported auth mode: {0}")]
    UnsupportedMode(String),

    /// The user has not finished linking yet; poll again later
    #[error("account not linked yet")]
    NotLinkedYet,

    /// The service refused the handshake
    #[error("account linking rejected: {0}")]
    Rejected(String),

    #[error("SMAPI request failed: {0}")]
    Soap(#[from] SoapError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Registry and search failures
#[derive(Debug, Error)]
pub enum SmapiError {
    #[error(transparent)]
    Control(#[from] ControlError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("SMAPI request failed: {0}")]
    Soap(#[from] SoapError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Fetching a document over HTTP failed
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("response exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("no music service matches '{0}'")]
    UnknownService(String),

    #[error("{service} has no search category '{category}'")]
    UnknownCategory { service: String, category: String },

    /// The service needs a linked account and none is stored
    #[error("{service} is not linked for household {household}")]
    NotLinked { service: String, household: String },
}

impl From<reqwest::Error> for SmapiError {
    fn from(error: reqwest::Error) -> Self {
        SmapiError::Http(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SmapiError>;
