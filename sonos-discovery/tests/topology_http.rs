//! Topology resolution and subnet probing against a local mock speaker

use soap_client::SoapClient;
use sonos_discovery::scan::scan_hosts;
use sonos_discovery::topology::{topology_from_candidates, topology_from_ip};
use sonos_discovery::{
    CancellationToken, DefaultStrategies, DiscoverOptions, Discoverer, DiscoveryStrategies,
    SsdpResponse, TopologyError,
};
use std::time::Duration;
use tokio::time::Instant;

const ZONE_GROUP_STATE_RESPONSE: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:GetZoneGroupStateResponse xmlns:u="urn:schemas-upnp-org:service:ZoneGroupTopology:1"><ZoneGroupState>&lt;ZoneGroupState&gt;&lt;ZoneGroups&gt;&lt;ZoneGroup Coordinator="RINCON_OFFICE" ID="RINCON_OFFICE:1"&gt;&lt;ZoneGroupMember UUID="RINCON_OFFICE" Location="http://192.168.1.10:1400/xml/device_description.xml" ZoneName="Office"&gt;&lt;Satellite UUID="RINCON_SUB" Location="http://192.168.1.11:1400/xml/device_description.xml" ZoneName="Office" Invisible="1"/&gt;&lt;/ZoneGroupMember&gt;&lt;/ZoneGroup&gt;&lt;/ZoneGroups&gt;&lt;/ZoneGroupState&gt;</ZoneGroupState></u:GetZoneGroupStateResponse></s:Body></s:Envelope>"#;

const DEVICE_DESCRIPTION: &str = r#"<?xml version="1.0"?><root xmlns="urn:schemas-upnp-org:device-1-0"><device><deviceType>urn:schemas-upnp-org:device:ZonePlayer:1</deviceType><friendlyName>Office</friendlyName><manufacturer>Sonos, Inc.</manufacturer><modelName>Sonos One</modelName><UDN>uuid:RINCON_OFFICE</UDN></device></root>"#;

fn soap_for(server: &mockito::Server) -> SoapClient {
    SoapClient::builder()
        .port(server.socket_address().port())
        .build()
        .unwrap()
}

async fn mock_zone_group_state(server: &mut mockito::Server, hits: usize) -> mockito::Mock {
    server
        .mock("POST", "/ZoneGroupTopology/Control")
        .match_header(
            "SOAPACTION",
            "\"urn:schemas-upnp-org:service:ZoneGroupTopology:1#GetZoneGroupState\"",
        )
        .with_status(200)
        .with_body(ZONE_GROUP_STATE_RESPONSE)
        .expect(hits)
        .create_async()
        .await
}

#[tokio::test]
async fn test_topology_from_ip_filters_invisible_satellites() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_zone_group_state(&mut server, 2).await;
    let soap = soap_for(&server);

    let visible = topology_from_ip(&soap, "127.0.0.1", false).await.unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible["RINCON_OFFICE"].name, "Office");

    let all = topology_from_ip(&soap, "127.0.0.1", true).await.unwrap();
    assert_eq!(all.len(), 2);
    assert!(all["RINCON_SUB"].invisible);

    mock.assert_async().await;
}

#[tokio::test]
async fn test_topology_from_candidates_dedupes_hosts() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_zone_group_state(&mut server, 1).await;
    let soap = soap_for(&server);

    let candidate = SsdpResponse {
        location: format!(
            "http://127.0.0.1:{}/xml/device_description.xml",
            server.socket_address().port()
        ),
        urn: "urn:schemas-upnp-org:device:ZonePlayer:1".to_string(),
        usn: "uuid:RINCON_OFFICE::urn:schemas-upnp-org:device:ZonePlayer:1".to_string(),
        server: None,
    };
    let set = topology_from_candidates(&soap, &[candidate.clone(), candidate], false)
        .await
        .unwrap();
    assert_eq!(set.len(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unparsable_zone_group_state_is_a_topology_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/ZoneGroupTopology/Control")
        .with_status(200)
        .with_body(r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:GetZoneGroupStateResponse xmlns:u="urn:schemas-upnp-org:service:ZoneGroupTopology:1"><ZoneGroupState>&lt;ZoneGroupState&gt;&lt;ZoneGroups&gt;</ZoneGroupState></u:GetZoneGroupStateResponse></s:Body></s:Envelope>"#)
        .create_async()
        .await;

    let err = topology_from_ip(&soap_for(&server), "127.0.0.1", false)
        .await
        .unwrap_err();
    assert!(matches!(err, TopologyError::Parse(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_unreachable_bootstrap_device() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let soap = SoapClient::builder().port(port).build().unwrap();
    let err = topology_from_ip(&soap, "127.0.0.1", false).await.unwrap_err();
    assert!(matches!(err, TopologyError::Unreachable { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_scan_finds_speaker_by_device_description() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/xml/device_description.xml")
        .with_status(200)
        .with_body(DEVICE_DESCRIPTION)
        .create_async()
        .await;

    let http = reqwest::Client::new();
    let ip = scan_hosts(
        &http,
        vec!["127.0.0.1".to_string()],
        server.socket_address().port(),
        4,
    )
    .await
    .unwrap();
    assert_eq!(ip, "127.0.0.1");
}

#[tokio::test]
async fn test_scan_ignores_non_sonos_hosts() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/xml/device_description.xml")
        .with_status(200)
        .with_body(r#"<root><device><deviceType>urn:schemas-upnp-org:device:InternetGatewayDevice:1</deviceType><manufacturer>Router Co</manufacturer><UDN>uuid:gw</UDN></device></root>"#)
        .create_async()
        .await;

    let http = reqwest::Client::new();
    let result = scan_hosts(
        &http,
        vec!["127.0.0.1".to_string()],
        server.socket_address().port(),
        4,
    )
    .await;
    assert!(result.is_err());
}

/// Strategies that skip the network-wide stages and point at the mock.
struct LoopbackStrategies {
    inner: DefaultStrategies,
}

#[async_trait::async_trait]
impl DiscoveryStrategies for LoopbackStrategies {
    async fn ssdp_probe(&self, _deadline: Instant) -> sonos_discovery::Result<Vec<SsdpResponse>> {
        Err(sonos_discovery::DiscoveryError::NoDevices)
    }

    async fn network_scan(&self, _concurrency: usize) -> sonos_discovery::Result<String> {
        Ok("127.0.0.1".to_string())
    }

    async fn topology_from_candidates(
        &self,
        candidates: &[SsdpResponse],
        include_invisible: bool,
    ) -> Result<sonos_discovery::DeviceSet, TopologyError> {
        self.inner
            .topology_from_candidates(candidates, include_invisible)
            .await
    }

    async fn topology_from_ip(
        &self,
        ip: &str,
        include_invisible: bool,
    ) -> Result<sonos_discovery::DeviceSet, TopologyError> {
        self.inner.topology_from_ip(ip, include_invisible).await
    }
}

#[tokio::test]
async fn test_discover_via_scan_fallback_against_mock_speaker() {
    let mut server = mockito::Server::new_async().await;
    let _mock = mock_zone_group_state(&mut server, 1).await;

    let engine = Discoverer::new(LoopbackStrategies {
        inner: DefaultStrategies::new(soap_for(&server)),
    });
    let devices = engine
        .discover(
            &CancellationToken::new(),
            &DiscoverOptions::default().with_timeout(Duration::from_secs(2)),
        )
        .await
        .unwrap();

    assert_eq!(devices.len(), 1);
    assert_eq!(devices["RINCON_OFFICE"].ip, "192.168.1.10");
}
