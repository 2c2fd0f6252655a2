//! SMAPI Auth Flow
//!
//! Links a household to a user's account with a DeviceLink or AppLink
//! service:
//!
//! 1. [`AuthFlow::begin`] asks the service for a link code and a
//!    registration URL the user opens in a browser
//! 2. after the user signs in, [`AuthFlow::complete`] exchanges the link
//!    code for a token pair and saves it
//!
//! `complete` fails with [`AuthError::NotLinkedYet`] until the user is done;
//! polling is left to the caller.

use serde::Serialize;
use soap_client::{child_text, SoapClient, SoapError};
use sonos_parser::{MusicService, MusicServiceAuth};
use tracing::{debug, info};
use xmltree::Element;

use crate::credentials::{credentials_header, required_text, result_element, SMAPI_NS};
use crate::error::AuthError;
use crate::tokens::{SmapiTokenPair, TokenWriter};

const NOT_LINKED_RETRY: &str = "NOT_LINKED_RETRY";
const NOT_LINKED_FAILURE: &str = "NOT_LINKED_FAILURE";

/// A started link handshake
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSession {
    pub service_id: u32,
    pub service_name: String,
    pub household_id: String,
    pub mode: MusicServiceAuth,
    /// Page the user opens to sign in
    pub reg_url: String,
    pub link_code: String,
    /// Whether the user has to type `link_code` on the registration page
    pub show_link_code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_device_id: Option<String>,
    #[serde(skip)]
    endpoint: String,
}

/// Drives account linking and saves the resulting tokens.
///
/// Holds only the write half of the token store.
#[derive(Debug, Clone)]
pub struct AuthFlow<W> {
    soap: SoapClient,
    store: W,
    device_id: String,
}

impl<W: TokenWriter> AuthFlow<W> {
    /// `device_id` identifies the controlling speaker to the service,
    /// usually its RINCON id.
    pub fn new(soap: SoapClient, store: W, device_id: impl Into<String>) -> Self {
        Self {
            soap,
            store,
            device_id: device_id.into(),
        }
    }

    async fn call(&self, endpoint: &str, action: &str, payload: &str) -> Result<Element, AuthError> {
        let header = credentials_header(&self.device_id, None);
        let response = self
            .soap
            .call_url(endpoint, SMAPI_NS, action, Some(&header), payload)
            .await
            .map_err(classify_fault)?;
        Ok(result_element(&response, action)?.clone())
    }

    /// Ask the service for a link code.
    pub async fn begin(
        &self,
        service: &MusicService,
        household_id: &str,
    ) -> Result<LinkSession, AuthError> {
        let endpoint = service.endpoint().to_string();
        let payload = format!(
            "<householdId>{}</householdId>",
            soap_client::escape_xml(household_id)
        );

        let link = match service.auth {
            MusicServiceAuth::Anonymous => return Err(AuthError::NotRequired(service.name.clone())),
            MusicServiceAuth::DeviceLink => {
                self.call(&endpoint, "getDeviceLinkCode", &payload).await?
            }
            MusicServiceAuth::AppLink => {
                let result = self.call(&endpoint, "getAppLink", &payload).await?;
                result
                    .get_child("authorizeAccount")
                    .and_then(|a| a.get_child("deviceLink"))
                    .cloned()
                    .ok_or_else(|| {
                        AuthError::UnsupportedMode(format!(
                            "{} offers app linking without a device link",
                            service.name
                        ))
                    })?
            }
        };

        let session = LinkSession {
            service_id: service.id,
            service_name: service.name.clone(),
            household_id: household_id.to_string(),
            mode: service.auth,
            reg_url: required_text(&link, "regUrl")?,
            link_code: required_text(&link, "linkCode")?,
            show_link_code: child_text(&link, "showLinkCode").as_deref() == Some("true"),
            link_device_id: child_text(&link, "linkDeviceId").filter(|id| !id.is_empty()),
            endpoint,
        };
        debug!(service = %service.name, mode = %service.auth, "Started account linking");
        Ok(session)
    }

    /// Exchange the session's link code for tokens and save them.
    pub async fn complete(&self, session: &LinkSession) -> Result<SmapiTokenPair, AuthError> {
        let mut payload = format!(
            "<householdId>{}</householdId><linkCode>{}</linkCode>",
            soap_client::escape_xml(&session.household_id),
            soap_client::escape_xml(&session.link_code)
        );
        if let Some(link_device_id) = &session.link_device_id {
            payload.push_str(&format!(
                "<linkDeviceId>{}</linkDeviceId>",
                soap_client::escape_xml(link_device_id)
            ));
        }

        let result = self
            .call(&session.endpoint, "getDeviceAuthToken", &payload)
            .await?;
        let tokens = SmapiTokenPair::new(
            required_text(&result, "authToken")?,
            required_text(&result, "privateKey")?,
        );

        self.store.save(
            &session.service_id.to_string(),
            &session.household_id,
            tokens.clone(),
        )?;
        info!(service = %session.service_name, household = %session.household_id, "Linked music service account");
        Ok(tokens)
    }
}

/// Map SMAPI linking faults to their meaning.
fn classify_fault(error: SoapError) -> AuthError {
    match error.fault_reason() {
        Some(reason) if reason.contains(NOT_LINKED_RETRY) => AuthError::NotLinkedYet,
        Some(reason) if reason.contains(NOT_LINKED_FAILURE) => {
            AuthError::Rejected(reason.to_string())
        }
        _ => AuthError::Soap(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_fault() {
        let fault = |reason: &str| SoapError::Fault {
            code: 500,
            reason: reason.to_string(),
        };
        assert!(matches!(
            classify_fault(fault("NOT_LINKED_RETRY")),
            AuthError::NotLinkedYet
        ));
        assert!(matches!(
            classify_fault(fault("Client.NOT_LINKED_FAILURE")),
            AuthError::Rejected(_)
        ));
        assert!(matches!(
            classify_fault(SoapError::Http(502)),
            AuthError::Soap(SoapError::Http(502))
        ));
    }
}
