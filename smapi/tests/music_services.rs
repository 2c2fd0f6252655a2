//! Registry, account linking and search against a local mock speaker and
//! music service

use std::sync::Arc;

use mockito::{Matcher, Mock, Server};
use smapi::{
    AuthError, AuthFlow, MemoryTokenStore, MusicServiceRegistry, SearchItemKind, SearchRequest,
    SmapiError, SmapiSearchClient, SmapiTokenPair, TokenReader, TokenWriter,
    MAX_PRESENTATION_MAP_BYTES, SMAPI_NS,
};
use soap_client::SoapClient;
use sonos_api::SonosClient;
use sonos_parser::{MusicService, MusicServiceAuth, PresentationMap};

const HOUSEHOLD: &str = "Sonos_ABC";
const DEVICE_ID: &str = "RINCON_LR";

fn upnp_envelope(service: &str, action: &str, body: &str) -> String {
    format!(
        r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><u:{action}Response xmlns:u="{service}">{body}</u:{action}Response></s:Body></s:Envelope>"#,
        action = action,
        service = service,
        body = body
    )
}

fn smapi_envelope(action: &str, result: &str) -> String {
    format!(
        r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><{action}Response xmlns="{ns}"><{action}Result>{result}</{action}Result></{action}Response></s:Body></s:Envelope>"#,
        action = action,
        ns = SMAPI_NS,
        result = result
    )
}

fn smapi_fault(reason: &str) -> String {
    format!(
        r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body><s:Fault><faultcode>s:Client.{reason}</faultcode><faultstring>{reason}</faultstring></s:Fault></s:Body></s:Envelope>"#,
        reason = reason
    )
}

fn soap_for(server: &Server) -> SoapClient {
    SoapClient::builder()
        .port(server.socket_address().port())
        .build()
        .unwrap()
}

fn service(server: &Server, id: u32, auth: MusicServiceAuth) -> MusicService {
    MusicService {
        id,
        name: "Spotify".to_string(),
        version: "1.1".to_string(),
        uri: format!("{}/smapi", server.url()),
        secure_uri: String::new(),
        container_type: "MService".to_string(),
        capabilities: 513,
        auth,
        service_type: sonos_parser::service_type_for_id(id),
        presentation_map_uri: format!("{}/pmap.xml", server.url()),
        manifest_uri: String::new(),
    }
}

async fn mock_smapi(server: &mut Server, action: &str, body: Matcher, status: usize, response: String) -> Mock {
    server
        .mock("POST", "/smapi")
        .match_header("SOAPACTION", format!("\"{}#{}\"", SMAPI_NS, action).as_str())
        .match_body(body)
        .with_status(status)
        .with_body(response)
        .create_async()
        .await
}

// ============================================================================
// Registry
// ============================================================================

#[tokio::test]
async fn test_list_and_find_services() {
    let mut server = Server::new_async().await;
    let descriptors = format!(
        r#"&lt;Services SchemaVersion="1"&gt;&lt;Service Id="9" Name="Spotify" Version="1.1" Uri="{url}/smapi" SecureUri="{url}/smapi" ContainerType="MService" Capabilities="513"&gt;&lt;Policy Auth="DeviceLink" PollInterval="30"/&gt;&lt;Presentation&gt;&lt;PresentationMap Version="2" Uri="{url}/pmap.xml"/&gt;&lt;/Presentation&gt;&lt;/Service&gt;&lt;Service Id="254" Name="TuneIn" Version="1.1" Uri="{url}/tunein" ContainerType="MService" Capabilities="0"&gt;&lt;Policy Auth="Anonymous"/&gt;&lt;/Service&gt;&lt;/Services&gt;"#,
        url = server.url()
    );
    let _list = server
        .mock("POST", "/MusicServices/Control")
        .match_header(
            "SOAPACTION",
            "\"urn:schemas-upnp-org:service:MusicServices:1#ListAvailableServices\"",
        )
        .with_status(200)
        .with_body(upnp_envelope(
            "urn:schemas-upnp-org:service:MusicServices:1",
            "ListAvailableServices",
            &format!(
                "<AvailableServiceDescriptorList>{}</AvailableServiceDescriptorList><AvailableServiceTypeList>2311,65031</AvailableServiceTypeList><AvailableServiceListVersion>RINCON_LR:42</AvailableServiceListVersion>",
                descriptors
            ),
        ))
        .expect(2)
        .create_async()
        .await;

    let registry = MusicServiceRegistry::new(SonosClient::with_soap_client(soap_for(&server)));
    let services = registry.list("127.0.0.1").await.unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0].auth, MusicServiceAuth::DeviceLink);
    assert_eq!(services[0].service_type, "2311");
    assert_eq!(services[1].auth, MusicServiceAuth::Anonymous);
    assert!(services[1].presentation_map_uri.is_empty());

    let tunein = registry.find("127.0.0.1", "tunein").await.unwrap();
    assert_eq!(tunein.id, 254);
}

#[tokio::test]
async fn test_unknown_service() {
    let mut server = Server::new_async().await;
    let _list = server
        .mock("POST", "/MusicServices/Control")
        .with_status(200)
        .with_body(upnp_envelope(
            "urn:schemas-upnp-org:service:MusicServices:1",
            "ListAvailableServices",
            "<AvailableServiceDescriptorList>&lt;Services/&gt;</AvailableServiceDescriptorList>",
        ))
        .create_async()
        .await;

    let registry = MusicServiceRegistry::new(SonosClient::with_soap_client(soap_for(&server)));
    let err = registry.find("127.0.0.1", "Deezer").await.unwrap_err();
    assert!(matches!(err, SmapiError::UnknownService(name) if name == "Deezer"));
}

#[tokio::test]
async fn test_household_id() {
    let mut server = Server::new_async().await;
    let _household = server
        .mock("POST", "/DeviceProperties/Control")
        .with_status(200)
        .with_body(upnp_envelope(
            "urn:schemas-upnp-org:service:DeviceProperties:1",
            "GetHouseholdID",
            "<CurrentHouseholdID>Sonos_ABC</CurrentHouseholdID>",
        ))
        .create_async()
        .await;

    let registry = MusicServiceRegistry::new(SonosClient::with_soap_client(soap_for(&server)));
    assert_eq!(registry.household_id("127.0.0.1").await.unwrap(), HOUSEHOLD);
}

#[tokio::test]
async fn test_presentation_map() {
    let mut server = Server::new_async().await;
    let _pmap = server
        .mock("GET", "/pmap.xml")
        .with_status(200)
        .with_body(r#"<Presentation><PresentationMap type="Search"><Match><SearchCategories><Category id="tracks" mappedId="search:track"/><Category id="albums" mappedId="search:album"/></SearchCategories></Match></PresentationMap></Presentation>"#)
        .create_async()
        .await;

    let registry = MusicServiceRegistry::default();
    let map = registry
        .presentation_map(&service(&server, 9, MusicServiceAuth::DeviceLink))
        .await
        .unwrap();
    assert_eq!(map.len(), 2);
    assert_eq!(map["tracks"], "search:track");
}

#[tokio::test]
async fn test_presentation_map_http_error() {
    let mut server = Server::new_async().await;
    let _pmap = server
        .mock("GET", "/pmap.xml")
        .with_status(404)
        .create_async()
        .await;

    let err = MusicServiceRegistry::default()
        .presentation_map(&service(&server, 9, MusicServiceAuth::DeviceLink))
        .await
        .unwrap_err();
    assert!(matches!(err, SmapiError::Http(_)));
}

#[tokio::test]
async fn test_oversized_presentation_map_is_refused() {
    let mut server = Server::new_async().await;
    let _pmap = server
        .mock("GET", "/pmap.xml")
        .with_status(200)
        .with_body(vec![b' '; MAX_PRESENTATION_MAP_BYTES + 1])
        .create_async()
        .await;

    let err = MusicServiceRegistry::default()
        .presentation_map(&service(&server, 9, MusicServiceAuth::DeviceLink))
        .await
        .unwrap_err();
    assert!(matches!(err, SmapiError::TooLarge { limit } if limit == MAX_PRESENTATION_MAP_BYTES));
}

// ============================================================================
// Account linking
// ============================================================================

#[tokio::test]
async fn test_device_link_begin_and_complete() {
    let mut server = Server::new_async().await;
    let _begin = mock_smapi(
        &mut server,
        "getDeviceLinkCode",
        Matcher::AllOf(vec![
            Matcher::Regex("<deviceId>RINCON_LR</deviceId>".to_string()),
            Matcher::Regex("<householdId>Sonos_ABC</householdId>".to_string()),
        ]),
        200,
        smapi_envelope(
            "getDeviceLinkCode",
            "<regUrl>https://link.example/activate</regUrl><linkCode>ABC123</linkCode><showLinkCode>true</showLinkCode><linkDeviceId>dev-7</linkDeviceId>",
        ),
    )
    .await;
    let _complete = mock_smapi(
        &mut server,
        "getDeviceAuthToken",
        Matcher::AllOf(vec![
            Matcher::Regex("<linkCode>ABC123</linkCode>".to_string()),
            Matcher::Regex("<linkDeviceId>dev-7</linkDeviceId>".to_string()),
        ]),
        200,
        smapi_envelope(
            "getDeviceAuthToken",
            "<authToken>tok-1</authToken><privateKey>key-1</privateKey>",
        ),
    )
    .await;

    let store = Arc::new(MemoryTokenStore::new());
    let flow = AuthFlow::new(SoapClient::new(), Arc::clone(&store), DEVICE_ID);
    let spotify = service(&server, 9, MusicServiceAuth::DeviceLink);

    let session = flow.begin(&spotify, HOUSEHOLD).await.unwrap();
    assert_eq!(session.reg_url, "https://link.example/activate");
    assert_eq!(session.link_code, "ABC123");
    assert!(session.show_link_code);
    assert_eq!(session.mode, MusicServiceAuth::DeviceLink);

    let tokens = flow.complete(&session).await.unwrap();
    assert_eq!(tokens.auth_token, "tok-1");

    let stored = store.load("9", HOUSEHOLD).unwrap().unwrap();
    assert_eq!(stored.auth_token, "tok-1");
    assert_eq!(stored.private_key, "key-1");
}

#[tokio::test]
async fn test_app_link_uses_device_link_section() {
    let mut server = Server::new_async().await;
    let _begin = mock_smapi(
        &mut server,
        "getAppLink",
        Matcher::Any,
        200,
        smapi_envelope(
            "getAppLink",
            "<authorizeAccount><appUrlStringId>SIGN_IN</appUrlStringId><deviceLink><regUrl>https://app.example/link</regUrl><linkCode>XYZ</linkCode><showLinkCode>false</showLinkCode></deviceLink></authorizeAccount>",
        ),
    )
    .await;

    let flow = AuthFlow::new(SoapClient::new(), MemoryTokenStore::new(), DEVICE_ID);
    let session = flow
        .begin(&service(&server, 9, MusicServiceAuth::AppLink), HOUSEHOLD)
        .await
        .unwrap();
    assert_eq!(session.link_code, "XYZ");
    assert!(!session.show_link_code);
    assert!(session.link_device_id.is_none());
}

#[tokio::test]
async fn test_complete_before_user_finished() {
    let mut server = Server::new_async().await;
    let _begin = mock_smapi(
        &mut server,
        "getDeviceLinkCode",
        Matcher::Any,
        200,
        smapi_envelope(
            "getDeviceLinkCode",
            "<regUrl>https://link.example/activate</regUrl><linkCode>ABC123</linkCode>",
        ),
    )
    .await;
    let _retry = mock_smapi(
        &mut server,
        "getDeviceAuthToken",
        Matcher::Any,
        500,
        smapi_fault("NOT_LINKED_RETRY"),
    )
    .await;

    let store = Arc::new(MemoryTokenStore::new());
    let flow = AuthFlow::new(SoapClient::new(), Arc::clone(&store), DEVICE_ID);
    let session = flow
        .begin(&service(&server, 9, MusicServiceAuth::DeviceLink), HOUSEHOLD)
        .await
        .unwrap();

    let err = flow.complete(&session).await.unwrap_err();
    assert!(matches!(err, AuthError::NotLinkedYet));
    assert!(store.load("9", HOUSEHOLD).unwrap().is_none());
}

#[tokio::test]
async fn test_anonymous_service_needs_no_link() {
    let server = Server::new_async().await;
    let flow = AuthFlow::new(SoapClient::new(), MemoryTokenStore::new(), DEVICE_ID);
    let err = flow
        .begin(&service(&server, 254, MusicServiceAuth::Anonymous), HOUSEHOLD)
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::NotRequired(_)));
}

// ============================================================================
// Search
// ============================================================================

fn categories() -> PresentationMap {
    let mut map = PresentationMap::new();
    map.insert("tracks".to_string(), "search:track".to_string());
    map.insert("albums".to_string(), "search:album".to_string());
    map
}

#[tokio::test]
async fn test_search_with_linked_account() {
    let mut server = Server::new_async().await;
    let _search = mock_smapi(
        &mut server,
        "search",
        Matcher::AllOf(vec![
            Matcher::Regex("<id>search:track</id>".to_string()),
            Matcher::Regex("<term>blue &amp; green</term>".to_string()),
            Matcher::Regex("<count>10</count>".to_string()),
            Matcher::Regex(
                "<loginToken><token>tok-1</token><key>key-1</key><householdId>Sonos_ABC</householdId></loginToken>"
                    .to_string(),
            ),
        ]),
        200,
        smapi_envelope(
            "search",
            "<index>0</index><count>1</count><total>57</total><mediaMetadata><id>spotify:track:1</id><itemType>track</itemType><title>Blue</title><trackMetadata><artist>Green</artist><album>Colours</album></trackMetadata></mediaMetadata>",
        ),
    )
    .await;

    let store = Arc::new(MemoryTokenStore::new());
    store
        .save("9", HOUSEHOLD, SmapiTokenPair::new("tok-1", "key-1"))
        .unwrap();
    let client = SmapiSearchClient::new(SoapClient::new(), store, DEVICE_ID);

    let result = client
        .search(
            &service(&server, 9, MusicServiceAuth::DeviceLink),
            HOUSEHOLD,
            &categories(),
            &SearchRequest::new("tracks", "blue & green").page(0, 10),
        )
        .await
        .unwrap();

    assert_eq!(result.total, 57);
    assert_eq!(result.items.len(), 1);
    let item = &result.items[0];
    assert_eq!(item.kind, SearchItemKind::Media);
    assert_eq!(item.title, "Blue");
    assert_eq!(item.artist.as_deref(), Some("Green"));
    assert!(item.can_play);
}

#[tokio::test]
async fn test_search_without_link_fails_before_request() {
    let mut server = Server::new_async().await;
    let search = server.mock("POST", "/smapi").expect(0).create_async().await;

    let client = SmapiSearchClient::new(SoapClient::new(), MemoryTokenStore::new(), DEVICE_ID);
    let err = client
        .search(
            &service(&server, 9, MusicServiceAuth::DeviceLink),
            HOUSEHOLD,
            &categories(),
            &SearchRequest::new("albums", "x"),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, SmapiError::NotLinked { household, .. } if household == HOUSEHOLD));
    search.assert_async().await;
}

#[tokio::test]
async fn test_search_unknown_category() {
    let server = Server::new_async().await;
    let client = SmapiSearchClient::new(SoapClient::new(), MemoryTokenStore::new(), DEVICE_ID);
    let err = client
        .search(
            &service(&server, 254, MusicServiceAuth::Anonymous),
            HOUSEHOLD,
            &categories(),
            &SearchRequest::new("podcasts", "x"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SmapiError::UnknownCategory { category, .. } if category == "podcasts"));
}

#[tokio::test]
async fn test_anonymous_search_sends_no_login_token() {
    let mut server = Server::new_async().await;
    let _search = mock_smapi(
        &mut server,
        "search",
        Matcher::AllOf(vec![
            Matcher::Regex("<deviceProvider>Sonos</deviceProvider></credentials>".to_string()),
            Matcher::Regex("<id>search:album</id>".to_string()),
        ]),
        200,
        smapi_envelope(
            "search",
            "<index>0</index><count>1</count><total>1</total><mediaCollection><id>album:1</id><itemType>album</itemType><title>Colours</title><canPlay>false</canPlay></mediaCollection>",
        ),
    )
    .await;

    let client = SmapiSearchClient::new(SoapClient::new(), MemoryTokenStore::new(), DEVICE_ID);
    let result = client
        .search(
            &service(&server, 254, MusicServiceAuth::Anonymous),
            HOUSEHOLD,
            &categories(),
            &SearchRequest::new("search:album", "colours"),
        )
        .await
        .unwrap();
    assert_eq!(result.items[0].kind, SearchItemKind::Collection);
    assert!(!result.items[0].can_play);
}
