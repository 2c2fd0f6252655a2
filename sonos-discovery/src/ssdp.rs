//! SSDP (Simple Service Discovery Protocol) probe
//!
//! Sends one M-SEARCH for ZonePlayer devices and collects unicast replies
//! until the stage deadline. Replies that do not parse or do not look like
//! Sonos are dropped.

use std::collections::HashSet;

use serde::Serialize;
use tokio::net::UdpSocket;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, warn};

use crate::error::{DiscoveryError, Result};

const MULTICAST_ADDR: &str = "239.255.255.250:1900";

/// Search target for Sonos speakers
pub const ZONE_PLAYER_ST: &str = "urn:schemas-upnp-org:device:ZonePlayer:1";

/// SSDP response containing device information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SsdpResponse {
    pub location: String,
    pub urn: String,
    pub usn: String,
    pub server: Option<String>,
}

impl SsdpResponse {
    /// Host part of the `LOCATION` header
    pub fn ip(&self) -> Option<&str> {
        sonos_parser::ip_from_location(&self.location)
    }

    /// Early filter on headers alone
    pub fn is_likely_sonos(&self) -> bool {
        self.urn.contains("ZonePlayer")
            || self.usn.contains("RINCON")
            || self
                .server
                .as_deref()
                .is_some_and(|s| s.to_lowercase().contains("sonos"))
    }
}

fn build_msearch(search_target: &str, mx: u64) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\
         USER-AGENT: sonos-ctl/1.0 UPnP/1.0\r\n\
         \r\n",
        mx, search_target
    )
}

/// Run one M-SEARCH round and collect distinct Sonos replies (by location)
/// until `deadline`.
pub async fn search(deadline: Instant) -> Result<Vec<SsdpResponse>> {
    let budget = deadline.saturating_duration_since(Instant::now());
    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|e| DiscoveryError::Network(format!("Failed to bind UDP socket: {}", e)))?;
    socket
        .set_multicast_loop_v4(true)
        .map_err(|e| DiscoveryError::Network(format!("Failed to set multicast loop: {}", e)))?;

    let mx = budget.as_secs().clamp(1, 5);
    socket
        .send_to(build_msearch(ZONE_PLAYER_ST, mx).as_bytes(), MULTICAST_ADDR)
        .await
        .map_err(|e| DiscoveryError::Network(format!("Failed to send M-SEARCH: {}", e)))?;

    let mut seen = HashSet::new();
    let mut responses = Vec::new();
    let mut buffer = [0u8; 2048];

    loop {
        let (size, from) = match timeout_at(deadline, socket.recv_from(&mut buffer)).await {
            Err(_) => break,
            Ok(Ok(received)) => received,
            Ok(Err(e)) => {
                if responses.is_empty() {
                    return Err(DiscoveryError::Network(format!("Socket error: {}", e)));
                }
                warn!(error = %e, "SSDP receive failed, keeping collected replies");
                break;
            }
        };

        let Ok(text) = std::str::from_utf8(&buffer[..size]) else {
            warn!(%from, "Skipping non UTF-8 SSDP datagram");
            continue;
        };
        let Some(response) = parse_ssdp_response(text) else {
            warn!(%from, "Skipping malformed SSDP datagram");
            continue;
        };
        if !response.is_likely_sonos() || !seen.insert(response.location.clone()) {
            continue;
        }
        debug!(%from, location = %response.location, "SSDP reply");
        responses.push(response);
    }

    if responses.is_empty() {
        return Err(DiscoveryError::Timeout(budget));
    }
    Ok(responses)
}

/// Parse the headers of a unicast M-SEARCH reply. `LOCATION`, `ST` and
/// `USN` are required; header names are case-insensitive.
fn parse_ssdp_response(datagram: &str) -> Option<SsdpResponse> {
    let mut lines = datagram.lines();
    if !lines.next()?.trim_start().starts_with("HTTP/1.") {
        return None;
    }

    let (mut location, mut urn, mut usn, mut server) = (None, None, None, None);
    for (name, value) in lines.filter_map(|line| line.split_once(':')) {
        let value = value.trim().to_string();
        match name.trim().to_ascii_uppercase().as_str() {
            "LOCATION" => location = Some(value),
            "ST" => urn = Some(value),
            "USN" => usn = Some(value),
            "SERVER" => server = Some(value),
            _ => {}
        }
    }

    Some(SsdpResponse {
        location: location.filter(|l| !l.is_empty())?,
        urn: urn?,
        usn: usn?,
        server,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = "HTTP/1.1 200 OK\r\n\
        CACHE-CONTROL: max-age = 1800\r\n\
        location: http://192.168.1.100:1400/xml/device_description.xml\r\n\
        St: urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
        USN: uuid:RINCON_000E58A0123456::urn:schemas-upnp-org:device:ZonePlayer:1\r\n\
        SERVER: Linux UPnP/1.0 Sonos/70.3-35220 (ZPS1)\r\n\
        \r\n";

    #[test]
    fn test_parse_reply() {
        let parsed = parse_ssdp_response(REPLY).unwrap();
        assert_eq!(parsed.location, "http://192.168.1.100:1400/xml/device_description.xml");
        assert_eq!(parsed.urn, ZONE_PLAYER_ST);
        assert!(parsed.usn.starts_with("uuid:RINCON_000E58A0123456::"));
        assert_eq!(parsed.server.as_deref(), Some("Linux UPnP/1.0 Sonos/70.3-35220 (ZPS1)"));
        assert_eq!(parsed.ip(), Some("192.168.1.100"));
        assert!(parsed.is_likely_sonos());
    }

    #[test]
    fn test_reply_without_required_headers_is_dropped() {
        for missing in ["location:", "St:", "USN:"] {
            let datagram: String = REPLY
                .lines()
                .filter(|line| !line.starts_with(missing))
                .map(|line| format!("{}\r\n", line))
                .collect();
            assert!(parse_ssdp_response(&datagram).is_none(), "without {}", missing);
        }
    }

    #[test]
    fn test_garbage_is_dropped() {
        assert!(parse_ssdp_response("").is_none());
        assert!(parse_ssdp_response("NOTIFY * HTTP/1.1\r\nLOCATION: x\r\nST: y\r\nUSN: z\r\n").is_none());
        assert!(parse_ssdp_response("not an ssdp reply\r\nrandom text\r\n").is_none());
    }

    #[test]
    fn test_non_sonos_responder() {
        let other = SsdpResponse {
            location: "http://192.168.1.1:80/desc.xml".to_string(),
            urn: "upnp:rootdevice".to_string(),
            usn: "uuid:router".to_string(),
            server: Some("Linux UPnP/1.0 MiniUPnPd".to_string()),
        };
        assert!(!other.is_likely_sonos());
    }

    #[test]
    fn test_msearch_message() {
        let msg = build_msearch(ZONE_PLAYER_ST, 2);
        assert!(msg.starts_with("M-SEARCH * HTTP/1.1\r\n"));
        assert!(msg.contains("ST: urn:schemas-upnp-org:device:ZonePlayer:1\r\n"));
        assert!(msg.contains("MX: 2\r\n"));
        assert!(msg.ends_with("\r\n\r\n"));
    }
}
