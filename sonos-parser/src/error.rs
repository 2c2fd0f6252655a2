//! Error types for XML parsing operations

use thiserror::Error;

/// Errors that can occur during XML parsing operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// XML deserialization failed
    #[error("XML deserialization failed: {0}")]
    XmlDeserializationFailed(String),

    /// Invalid XML structure
    #[error("Invalid XML structure: {0}")]
    InvalidXmlStructure(String),

    /// Missing required element
    #[error("Missing required element: {0}")]
    MissingRequiredElement(String),

    /// A value is present but cannot be interpreted
    #[error("Invalid value '{value}' for {field}")]
    InvalidValue { field: String, value: String },
}

impl ParseError {
    pub(crate) fn invalid_value(field: &str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

/// Result type alias for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;
