//! SMAPI envelope pieces shared by account linking and search.

use soap_client::{child_text, escape_xml, SoapError};
use xmltree::Element;

use crate::tokens::SmapiTokenPair;

/// Namespace of SMAPI actions and headers
pub const SMAPI_NS: &str = "http://www.sonos.com/Services/1.1";

/// The `credentials` SOAP header. Linked accounts add a `loginToken`.
pub(crate) fn credentials_header(
    device_id: &str,
    login: Option<(&SmapiTokenPair, &str)>,
) -> String {
    let login_token = login
        .map(|(tokens, household_id)| {
            format!(
                "<loginToken><token>{}</token><key>{}</key><householdId>{}</householdId></loginToken>",
                escape_xml(&tokens.auth_token),
                escape_xml(&tokens.private_key),
                escape_xml(household_id)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<credentials xmlns="{}"><deviceId>{}</deviceId><deviceProvider>Sonos</deviceProvider>{}</credentials>"#,
        SMAPI_NS,
        escape_xml(device_id),
        login_token
    )
}

/// The `{action}Result` child of an `{action}Response` element.
pub(crate) fn result_element<'a>(response: &'a Element, action: &str) -> Result<&'a Element, SoapError> {
    let name = format!("{}Result", action);
    response
        .get_child(name.as_str())
        .ok_or_else(|| SoapError::Parse(format!("Missing {} element", name)))
}

/// Text of a required child, trimmed.
pub(crate) fn required_text(xml: &Element, name: &str) -> Result<String, SoapError> {
    child_text(xml, name)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SoapError::Parse(format!("Missing {} element", name)))
}
