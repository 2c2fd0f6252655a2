//! DIDL-Lite item model, parser and writer
//!
//! DIDL-Lite is the item-list dialect every Sonos content surface speaks:
//! queue entries, favorites, browse results and enqueue metadata.
//!
//! ```xml
//! <DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" ...>
//!   <item id="Q:0/1" parentID="Q:0" restricted="true">
//!     <dc:title>Song Title</dc:title>
//!     <upnp:class>object.item.audioItem.musicTrack</upnp:class>
//!     <res protocolInfo="sonos.com-spotify:*:audio/x-spotify:*">x-sonos-spotify:...</res>
//!   </item>
//! </DIDL-Lite>
//! ```

use std::borrow::Cow;

use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

use crate::common::xml_decode;
use crate::error::ParseResult;

/// Namespace of the `desc` element carrying a service account token.
pub const RINCON_METADATA_NS: &str = "urn:schemas-rinconnetworks-com:metadata-1-0/";

/// A single playable (or browsable) DIDL-Lite item.
///
/// Missing metadata is tolerated: absent title or class yield empty strings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DidlItem {
    /// Hierarchical content address, e.g. `Q:0/1` or `FV:2/14`
    pub id: String,
    pub parent_id: String,
    pub restricted: bool,
    pub title: String,
    /// Dotted class taxonomy, e.g. `object.item.audioItem.musicTrack`
    pub class: String,
    /// Text of the first `res` element
    pub uri: String,
    /// `protocolInfo` attribute of the first `res` element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_info: Option<String>,
    /// Embedded DIDL-Lite fragment describing the wrapped resource (favorites)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub res_md: Option<String>,
    /// Service account descriptor from the `desc` element
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album_art_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DidlDocument {
    #[serde(rename = "item", default)]
    items: Vec<RawItem>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(rename = "@id", default)]
    id: String,
    #[serde(rename = "@parentID", default)]
    parent_id: String,
    #[serde(rename = "@restricted", default)]
    restricted: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    class: Option<String>,
    #[serde(rename = "res", default)]
    resources: Vec<RawResource>,
    #[serde(rename = "resMD", default)]
    res_md: Option<String>,
    #[serde(default)]
    desc: Option<RawDesc>,
    #[serde(default)]
    creator: Option<String>,
    #[serde(default)]
    album: Option<String>,
    #[serde(rename = "albumArtURI", default)]
    album_art_uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawResource {
    #[serde(rename = "@protocolInfo", default)]
    protocol_info: Option<String>,
    #[serde(rename = "$value", default)]
    uri: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawDesc {
    #[serde(rename = "$value", default)]
    value: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<RawItem> for DidlItem {
    fn from(raw: RawItem) -> Self {
        let first_res = raw.resources.into_iter().next().unwrap_or_default();
        DidlItem {
            id: raw.id,
            parent_id: raw.parent_id,
            restricted: matches!(raw.restricted.as_deref().map(str::trim), Some("true" | "1")),
            title: raw.title.map(|t| t.trim().to_string()).unwrap_or_default(),
            class: raw.class.map(|c| c.trim().to_string()).unwrap_or_default(),
            uri: first_res.uri.map(|u| u.trim().to_string()).unwrap_or_default(),
            protocol_info: non_empty(first_res.protocol_info),
            res_md: non_empty(raw.res_md),
            desc: raw.desc.and_then(|d| non_empty(d.value)),
            creator: non_empty(raw.creator),
            album: non_empty(raw.album),
            album_art_uri: non_empty(raw.album_art_uri),
        }
    }
}

/// Parse a DIDL-Lite document into its items, in document order.
///
/// Fails only on malformed XML; partial metadata never drops an item.
pub fn parse_didl_items(xml: &str) -> ParseResult<Vec<DidlItem>> {
    let doc: DidlDocument = xml_decode::parse(xml)?;
    Ok(doc.items.into_iter().map(DidlItem::from).collect())
}

/// Resolve the playable URI of a favorite.
///
/// Returns the item's own URI when present, otherwise the URI of the first
/// item of its embedded `resMD` fragment. An empty string means unplayable.
pub fn favorite_uri(item: &DidlItem) -> String {
    if !item.uri.is_empty() {
        return item.uri.clone();
    }
    match item.res_md.as_deref() {
        Some(res_md) if !res_md.trim().is_empty() => parse_didl_items(res_md)
            .ok()
            .and_then(|items| items.into_iter().next())
            .map(|inner| inner.uri)
            .unwrap_or_default(),
        _ => String::new(),
    }
}

impl DidlItem {
    /// True when the class marks a container (album, playlist, ...)
    pub fn is_container(&self) -> bool {
        self.class.starts_with("object.container")
    }

    /// Render this item as a single-item DIDL-Lite document suitable for
    /// `EnqueuedURIMetaData` / `CurrentURIMetaData` arguments.
    pub fn to_didl_xml(&self) -> String {
        let mut xml = String::from(
            r#"<DIDL-Lite xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns:r="urn:schemas-rinconnetworks-com:metadata-1-0/" xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/">"#,
        );
        xml.push_str(&format!(
            r#"<item id="{}" parentID="{}" restricted="{}">"#,
            escape(self.id.as_str()),
            escape(self.parent_id.as_str()),
            self.restricted
        ));
        xml.push_str(&format!("<dc:title>{}</dc:title>", escape(self.title.as_str())));
        xml.push_str(&format!("<upnp:class>{}</upnp:class>", escape(self.class.as_str())));
        if !self.uri.is_empty() {
            let protocol_info: Cow<str> = self
                .protocol_info
                .as_deref()
                .map(escape)
                .unwrap_or(Cow::Borrowed("*:*:*:*"));
            xml.push_str(&format!(
                r#"<res protocolInfo="{}">{}</res>"#,
                protocol_info,
                escape(self.uri.as_str())
            ));
        }
        if let Some(desc) = &self.desc {
            xml.push_str(&format!(
                r#"<desc id="cdudn" nameSpace="{}">{}</desc>"#,
                RINCON_METADATA_NS,
                escape(desc.as_str())
            ));
        }
        xml.push_str("</item></DIDL-Lite>");
        xml
    }
}
