//! # sonos-parser
//!
//! XML parsing for the document dialects a Sonos household speaks:
//! DIDL-Lite item lists, zone group state, music service descriptor lists
//! and presentation maps. Parsers are synchronous and allocation-only; all
//! network access lives in the crates above this one.
//!
//! ## Usage
//!
//! ```rust
//! use sonos_parser::{favorite_uri, parse_didl_items};
//!
//! let xml = r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/"
//!     xmlns:dc="http://purl.org/dc/elements/1.1/"
//!     xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/">
//!   <item id="Q:0/1" parentID="Q:0" restricted="true">
//!     <dc:title>Hello</dc:title>
//!     <upnp:class>object.item.audioItem.musicTrack</upnp:class>
//!     <res protocolInfo="sonos.com-spotify:*:audio/x-spotify:*">x-sonos-spotify:spotify%3atrack%3a123</res>
//!   </item>
//! </DIDL-Lite>"#;
//!
//! let items = parse_didl_items(xml).unwrap();
//! assert_eq!(items[0].title, "Hello");
//! assert_eq!(favorite_uri(&items[0]), "x-sonos-spotify:spotify%3atrack%3a123");
//! ```

pub mod common;
pub mod error;
pub mod services;

pub use error::{ParseError, ParseResult};

pub use common::{favorite_uri, parse_didl_items, DidlItem};
pub use services::music_services::{
    parse_service_descriptor_list, service_type_for_id, MusicService, MusicServiceAuth,
};
pub use services::presentation_map::{parse_presentation_map_xml, PresentationMap};
pub use services::zone_group_topology::{
    ip_from_location, Satellite, ZoneGroup, ZoneGroupMember, ZoneGroupState,
};
