//! Private SOAP client for UPnP device communication
//!
//! This crate provides a minimal async SOAP client for talking to Sonos
//! speakers (UPnP control endpoints on port 1400) and to third-party music
//! services that speak SMAPI (full service URLs with a SOAP header).
//! It owns envelopes and fault extraction, not protocol semantics.

mod error;

pub use error::SoapError;

use std::time::Duration;
use tracing::debug;
use xmltree::Element;

/// Default UPnP control port on Sonos devices.
pub const DEFAULT_DEVICE_PORT: u16 = 1400;

/// A minimal SOAP client for UPnP device communication
#[derive(Debug, Clone)]
pub struct SoapClient {
    http: reqwest::Client,
    port: u16,
}

/// Builder for [`SoapClient`] when the defaults don't fit.
#[derive(Debug, Clone)]
pub struct SoapClientBuilder {
    port: u16,
    connect_timeout: Duration,
    request_timeout: Duration,
}

impl Default for SoapClientBuilder {
    fn default() -> Self {
        Self {
            port: DEFAULT_DEVICE_PORT,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl SoapClientBuilder {
    /// Port used for device control URLs (`http://{ip}:{port}/{endpoint}`)
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<SoapClient, SoapError> {
        let http = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| SoapError::Network(format!("Failed to create HTTP client: {}", e)))?;
        Ok(SoapClient {
            http,
            port: self.port,
        })
    }
}

impl SoapClient {
    /// Create a new SOAP client with default configuration
    pub fn new() -> Self {
        Self::builder().build().unwrap_or_else(|_| Self {
            http: reqwest::Client::default(),
            port: DEFAULT_DEVICE_PORT,
        })
    }

    pub fn builder() -> SoapClientBuilder {
        SoapClientBuilder::default()
    }

    /// Port used for device control URLs
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The underlying HTTP client, shared so that plain GETs (device
    /// descriptions, presentation maps) reuse the same connection pool.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Base URL of a device, e.g. `http://192.168.1.10:1400`
    pub fn device_base_url(&self, ip: &str) -> String {
        format!("http://{}:{}", ip, self.port)
    }

    /// Send a UPnP SOAP action to a device and return the `{action}Response` element
    pub async fn call(
        &self,
        ip: &str,
        endpoint: &str,
        service_uri: &str,
        action: &str,
        payload: &str,
    ) -> Result<Element, SoapError> {
        let body = format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><s:Body><u:{action} xmlns:u="{service_uri}">{payload}</u:{action}></s:Body></s:Envelope>"#,
            action = action,
            service_uri = service_uri,
            payload = payload
        );
        let url = format!("{}/{}", self.device_base_url(ip), endpoint.trim_start_matches('/'));
        self.post(&url, service_uri, action, body).await
    }

    /// Send a SOAP action to an arbitrary service URL with an optional SOAP header.
    ///
    /// Used for SMAPI music services, where the action element carries the
    /// service namespace as its default namespace so that arguments inherit it.
    pub async fn call_url(
        &self,
        url: &str,
        service_uri: &str,
        action: &str,
        header: Option<&str>,
        payload: &str,
    ) -> Result<Element, SoapError> {
        let header = header
            .map(|h| format!("<s:Header>{}</s:Header>", h))
            .unwrap_or_default();
        let body = format!(
            r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">{header}<s:Body><{action} xmlns="{service_uri}">{payload}</{action}></s:Body></s:Envelope>"#,
            header = header,
            action = action,
            service_uri = service_uri,
            payload = payload
        );
        self.post(url, service_uri, action, body).await
    }

    async fn post(
        &self,
        url: &str,
        service_uri: &str,
        action: &str,
        body: String,
    ) -> Result<Element, SoapError> {
        let soap_action = format!("\"{}#{}\"", service_uri, action);
        debug!(url, action, "soap request");

        let response = self
            .http
            .post(url)
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .header("SOAPACTION", soap_action)
            .body(body)
            .send()
            .await
            .map_err(|e| SoapError::Network(e.to_string()))?;

        let status = response.status();
        let xml_text = response
            .text()
            .await
            .map_err(|e| SoapError::Network(e.to_string()))?;

        // Faults arrive with HTTP 500, so look for one before the status.
        match Element::parse(xml_text.as_bytes()) {
            Ok(xml) => match extract_response(&xml, action) {
                Err(fault @ SoapError::Fault { .. }) => Err(fault),
                _ if !status.is_success() => Err(SoapError::Http(status.as_u16())),
                outcome => outcome,
            },
            Err(_) if !status.is_success() => Err(SoapError::Http(status.as_u16())),
            Err(e) => Err(SoapError::Parse(e.to_string())),
        }
    }
}

impl Default for SoapClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the `{action}Response` element from a SOAP envelope, or the fault.
fn extract_response(xml: &Element, action: &str) -> Result<Element, SoapError> {
    let body = xml
        .get_child("Body")
        .ok_or_else(|| SoapError::Parse("Missing SOAP Body".to_string()))?;

    if let Some(fault) = body.get_child("Fault") {
        let code = fault
            .get_child("detail")
            .and_then(|d| d.get_child("UPnPError").or_else(|| d.get_child("UpnPError")))
            .and_then(|e| e.get_child("errorCode"))
            .and_then(|c| c.get_text())
            .and_then(|t| t.trim().parse::<u16>().ok())
            .unwrap_or(500);
        let reason = fault
            .get_child("faultstring")
            .and_then(|c| c.get_text())
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        return Err(SoapError::Fault { code, reason });
    }

    let response_name = format!("{}Response", action);
    body.get_child(response_name.as_str())
        .cloned()
        .ok_or_else(|| SoapError::Parse(format!("Missing {} element", response_name)))
}

/// Read the trimmed text of a direct child element.
pub fn child_text(xml: &Element, name: &str) -> Option<String> {
    xml.get_child(name)
        .and_then(|e| e.get_text())
        .map(|t| t.trim().to_string())
}

/// Escape a value for inclusion as XML text or attribute content.
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_response_with_valid_response() {
        let xml_str = r#"
            <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
                <s:Body>
                    <u:GetGroupVolumeResponse xmlns:u="urn:schemas-upnp-org:service:GroupRenderingControl:1">
                        <CurrentVolume>42</CurrentVolume>
                    </u:GetGroupVolumeResponse>
                </s:Body>
            </s:Envelope>
        "#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        let response = extract_response(&xml, "GetGroupVolume").unwrap();
        assert_eq!(response.name, "GetGroupVolumeResponse");
        assert_eq!(child_text(&response, "CurrentVolume").as_deref(), Some("42"));
    }

    #[test]
    fn test_extract_response_with_upnp_fault() {
        let xml_str = r#"
            <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
                <s:Body>
                    <s:Fault>
                        <faultcode>s:Client</faultcode>
                        <faultstring>UPnPError</faultstring>
                        <detail>
                            <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
                                <errorCode>701</errorCode>
                            </UPnPError>
                        </detail>
                    </s:Fault>
                </s:Body>
            </s:Envelope>
        "#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        match extract_response(&xml, "Play").unwrap_err() {
            SoapError::Fault { code, reason } => {
                assert_eq!(code, 701);
                assert_eq!(reason, "UPnPError");
            }
            other => panic!("Expected SoapError::Fault, got {:?}", other),
        }
    }

    #[test]
    fn test_smapi_fault_keeps_fault_string() {
        let xml_str = r#"
            <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
                <s:Body>
                    <s:Fault>
                        <faultcode>s:Client.NOT_LINKED_RETRY</faultcode>
                        <faultstring>NOT_LINKED_RETRY</faultstring>
                    </s:Fault>
                </s:Body>
            </s:Envelope>
        "#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        let err = extract_response(&xml, "getDeviceAuthToken").unwrap_err();
        assert_eq!(err.fault_reason(), Some("NOT_LINKED_RETRY"));
        assert!(matches!(err, SoapError::Fault { code: 500, .. }));
    }

    #[test]
    fn test_extract_response_missing_body() {
        let xml_str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"></s:Envelope>"#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        match extract_response(&xml, "Play").unwrap_err() {
            SoapError::Parse(msg) => assert!(msg.contains("Missing SOAP Body")),
            other => panic!("Expected SoapError::Parse, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_response_missing_action_response() {
        let xml_str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body></s:Body></s:Envelope>"#;

        let xml = Element::parse(xml_str.as_bytes()).unwrap();
        match extract_response(&xml, "Play").unwrap_err() {
            SoapError::Parse(msg) => assert!(msg.contains("Missing PlayResponse element")),
            other => panic!("Expected SoapError::Parse, got {:?}", other),
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"a<b>&"c'"#), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(escape_xml("plain"), "plain");
    }

    #[test]
    fn test_device_base_url_uses_configured_port() {
        let client = SoapClient::builder().port(1443).build().unwrap();
        assert_eq!(client.device_base_url("10.0.0.2"), "http://10.0.0.2:1443");
        assert_eq!(SoapClient::new().port(), DEFAULT_DEVICE_PORT);
    }
}
