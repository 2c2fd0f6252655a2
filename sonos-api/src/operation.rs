//! Operation framework
//!
//! Every UPnP action is a zero-sized type implementing [`SonosOperation`]:
//! it names its service and action, turns a typed request into the SOAP
//! argument payload and turns the `{Action}Response` element back into a
//! typed response. Requests validate themselves before anything is sent.

use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use xmltree::Element;

use crate::error::ControlError;
use crate::service::Service;

/// A typed UPnP action.
pub trait SonosOperation {
    /// The request type for this operation
    type Request: Serialize + Validate;

    /// The response type for this operation
    type Response: for<'de> Deserialize<'de>;

    /// The UPnP service this operation belongs to
    const SERVICE: Service;

    /// The SOAP action name for this operation
    const ACTION: &'static str;

    /// Build the argument payload that goes inside the action element.
    ///
    /// Text arguments are XML-escaped here; DIDL-Lite metadata travels as
    /// escaped text, not as nested elements.
    fn build_payload(request: &Self::Request) -> Result<String, ValidationError>;

    /// Parse the `{Action}Response` element.
    fn parse_response(xml: &Element) -> Result<Self::Response, ControlError>;
}

/// Validation error types
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Parameter '{parameter}' value '{value}' is out of range ({min}..={max})")]
    RangeError {
        parameter: String,
        value: String,
        min: String,
        max: String,
    },

    #[error("Parameter '{parameter}' value '{value}' is invalid: {reason}")]
    InvalidValue {
        parameter: String,
        value: String,
        reason: String,
    },

    #[error("Required parameter '{parameter}' is missing")]
    MissingParameter { parameter: String },
}

impl ValidationError {
    pub fn range_error(
        parameter: &str,
        min: impl Display,
        max: impl Display,
        value: impl Display,
    ) -> Self {
        Self::RangeError {
            parameter: parameter.to_string(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
        }
    }

    pub fn invalid_value(parameter: &str, value: impl Display, reason: &str) -> Self {
        Self::InvalidValue {
            parameter: parameter.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn missing(parameter: &str) -> Self {
        Self::MissingParameter {
            parameter: parameter.to_string(),
        }
    }
}

/// How much checking happens before a request is sent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationLevel {
    /// Send whatever the caller built
    None,
    /// Range and presence checks
    #[default]
    Boundary,
    /// Boundary checks plus format rules (URI schemes, numeric targets, ...)
    Comprehensive,
}

/// Trait for request types that can be validated
pub trait Validate {
    /// Cheap range and presence checks
    fn validate_boundary(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Boundary checks plus format rules
    fn validate_comprehensive(&self) -> Result<(), ValidationError> {
        self.validate_boundary()
    }

    fn validate(&self, level: ValidationLevel) -> Result<(), ValidationError> {
        match level {
            ValidationLevel::None => Ok(()),
            ValidationLevel::Boundary => self.validate_boundary(),
            ValidationLevel::Comprehensive => self.validate_comprehensive(),
        }
    }
}

/// Render one `<Name>value</Name>` argument with the value escaped.
pub(crate) fn arg(name: &str, value: impl Display) -> String {
    format!(
        "<{name}>{value}</{name}>",
        name = name,
        value = soap_client::escape_xml(&value.to_string())
    )
}

/// Text of a response argument that must be present. Empty text is allowed.
pub(crate) fn text_field(xml: &Element, name: &str) -> Result<String, ControlError> {
    match xml.get_child(name) {
        Some(child) => Ok(child
            .get_text()
            .map(|t| t.trim().to_string())
            .unwrap_or_default()),
        None => Err(ControlError::Parse(format!("Missing {} element", name))),
    }
}

/// A numeric response argument.
pub(crate) fn parse_field<T>(xml: &Element, name: &str) -> Result<T, ControlError>
where
    T: FromStr,
{
    let text = text_field(xml, name)?;
    text.parse()
        .map_err(|_| ControlError::Parse(format!("Invalid {} value '{}'", name, text)))
}

/// A UPnP boolean argument (`0`/`1`, sometimes `true`/`false`).
pub(crate) fn parse_bool_field(xml: &Element, name: &str) -> Result<bool, ControlError> {
    let text = text_field(xml, name)?;
    match text.as_str() {
        "1" | "true" | "True" => Ok(true),
        "0" | "false" | "False" => Ok(false),
        _ => Err(ControlError::Parse(format!(
            "Invalid {} value '{}'",
            name, text
        ))),
    }
}
